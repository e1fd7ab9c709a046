//! Transport stream demultiplexing: program tables plus PES reassembly.

pub mod pes;
pub mod tables;

pub use pes::{PesPacket, PesReassembler};
pub use tables::{ElementaryStream, PacketRole, PatParser, PmtParser, ProgramTableTracker};

use crate::error::Result;
use crate::packet::TransportPacket;

/// Owns the table tracker and the reassembler for one stream session.
#[derive(Default)]
pub struct TsDemuxer {
    tables: ProgramTableTracker,
    reassembler: PesReassembler,
}

impl TsDemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: ProgramTableTracker) -> Self {
        Self { tables, reassembler: PesReassembler::new() }
    }

    /// Routes one packet. Table sections update the program map; elementary
    /// stream payloads may complete a PES unit.
    pub fn read(&mut self, packet: &TransportPacket) -> Result<Option<PesPacket>> {
        if !packet.has_payload() {
            return Ok(None);
        }
        let start = packet.payload_unit_start();
        match self.tables.classify(packet.pid()) {
            PacketRole::ProgramAssociation if start => {
                self.tables.handle_pat(packet.payload())?;
                Ok(None)
            }
            PacketRole::ProgramMap if start => {
                self.tables.handle_pmt(packet.pid(), packet.payload())?;
                Ok(None)
            }
            PacketRole::Elementary(stream_type) => Ok(self.reassembler.push(
                packet.pid(),
                stream_type,
                start,
                packet.payload(),
            )),
            _ => Ok(None),
        }
    }

    /// Forces out the units still pending at end of stream.
    pub fn finish(&mut self) -> Vec<PesPacket> {
        self.reassembler.flush()
    }

    pub fn tables(&self) -> &ProgramTableTracker {
        &self.tables
    }

    pub fn reset(&mut self) {
        self.tables.reset();
        self.reassembler.reset();
    }
}
