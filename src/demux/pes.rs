//! Reassembles PES units from transport packet payloads.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::types::StreamType;

/// A complete PES unit, header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PesPacket {
    pub pid: u16,
    pub stream_type: StreamType,
    pub payload: Bytes,
}

struct PendingUnit {
    stream_type: StreamType,
    buf: BytesMut,
}

/// Per-PID reassembly. A unit is only known to be complete when the next
/// unit for the same PID starts, so the last unit of a stream needs an
/// explicit [`PesReassembler::flush`].
#[derive(Default)]
pub struct PesReassembler {
    pending: HashMap<u16, PendingUnit>,
}

impl PesReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one packet payload. Returns the previous unit for `pid` when
    /// `unit_start` closes it.
    pub fn push(
        &mut self,
        pid: u16,
        stream_type: StreamType,
        unit_start: bool,
        payload: &[u8],
    ) -> Option<PesPacket> {
        if unit_start {
            let fresh = PendingUnit { stream_type, buf: BytesMut::from(payload) };
            self.pending
                .insert(pid, fresh)
                .map(|prior| PesPacket { pid, stream_type: prior.stream_type, payload: prior.buf.freeze() })
        } else {
            // continuation without a start is dropped
            if let Some(unit) = self.pending.get_mut(&pid) {
                unit.buf.extend_from_slice(payload);
            }
            None
        }
    }

    /// Emits every pending unit, ordered by PID.
    pub fn flush(&mut self) -> Vec<PesPacket> {
        let mut units: Vec<PesPacket> = self
            .pending
            .drain()
            .map(|(pid, unit)| PesPacket { pid, stream_type: unit.stream_type, payload: unit.buf.freeze() })
            .collect();
        units.sort_by_key(|p| p.pid);
        units
    }

    pub fn pending_pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.pending.keys().copied()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
