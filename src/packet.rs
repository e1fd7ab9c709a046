//! Transport packet header parsing.

use bytes::Bytes;

use crate::constants::{TS_HEADER_SIZE, TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::error::{Error, Result};

/// One 188-byte MPEG-TS packet. The raw bytes are kept so the packet can be
/// written to the rollover buffer unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPacket {
    raw: Bytes,
    pid: u16,
    payload_unit_start: bool,
    transport_error: bool,
    continuity_counter: u8,
    payload_offset: Option<usize>,
}

impl TransportPacket {
    /// Parses a 188-byte region starting at a sync byte.
    pub fn parse(raw: Bytes) -> Result<Self> {
        if raw.len() != TS_PACKET_SIZE {
            return Err(Error::malformed(format!(
                "expected {TS_PACKET_SIZE} bytes, got {}",
                raw.len()
            )));
        }
        if raw[0] != TS_SYNC_BYTE {
            return Err(Error::malformed(format!("bad sync byte {:#04x}", raw[0])));
        }

        let pid = (((raw[1] & 0x1F) as u16) << 8) | (raw[2] as u16);
        let payload_unit_start = raw[1] & 0x40 != 0;
        let transport_error = raw[1] & 0x80 != 0;
        let adaptation_field_control = (raw[3] & 0x30) >> 4;
        let continuity_counter = raw[3] & 0x0F;

        // 0 is reserved, 2 is adaptation field only
        let payload_offset = match adaptation_field_control {
            1 => Some(TS_HEADER_SIZE),
            3 => {
                let offset = TS_HEADER_SIZE + 1 + raw[4] as usize;
                if offset > TS_PACKET_SIZE {
                    return Err(Error::malformed(format!(
                        "adaptation field length {} overruns packet",
                        raw[4]
                    )));
                }
                Some(offset)
            }
            _ => None,
        };

        Ok(Self {
            raw,
            pid,
            payload_unit_start,
            transport_error,
            continuity_counter,
            payload_offset,
        })
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    pub fn payload_unit_start(&self) -> bool {
        self.payload_unit_start
    }

    pub fn transport_error(&self) -> bool {
        self.transport_error
    }

    pub fn continuity_counter(&self) -> u8 {
        self.continuity_counter
    }

    /// True when the adaptation field control signals a payload, even an empty one.
    pub fn has_payload(&self) -> bool {
        self.payload_offset.is_some()
    }

    /// Payload bytes after the header and any adaptation field.
    pub fn payload(&self) -> &[u8] {
        match self.payload_offset {
            Some(offset) => &self.raw[offset..],
            None => &[],
        }
    }

    /// The whole packet, sync byte included.
    pub fn as_bytes(&self) -> &Bytes {
        &self.raw
    }
}
