//! Recovers 188-byte packet framing from raw UDP payloads.

use bytes::{Buf, BytesMut};
use tracing::{info, warn};

use crate::constants::{TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::packet::TransportPacket;

/// Accumulates datagrams and slices them into transport packets.
///
/// Datagrams are not assumed to be packet aligned; bytes that do not start
/// at a sync byte are discarded and the remainder of a partial packet is
/// kept for the next call.
#[derive(Debug, Default)]
pub struct SyncFramer {
    buf: BytesMut,
    bytes_skipped: u64,
}

impl SyncFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a datagram and returns every complete packet now available.
    pub fn push(&mut self, datagram: &[u8]) -> Vec<TransportPacket> {
        self.buf.extend_from_slice(datagram);

        let mut packets = Vec::with_capacity(self.buf.len() / TS_PACKET_SIZE);
        self.skip_to_sync();
        while self.buf.len() >= TS_PACKET_SIZE {
            let raw = self.buf.split_to(TS_PACKET_SIZE).freeze();
            match TransportPacket::parse(raw) {
                Ok(packet) => packets.push(packet),
                Err(e) => warn!("dropping transport packet: {e}"),
            }
            self.skip_to_sync();
        }
        packets
    }

    /// Bytes waiting for the rest of their packet.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Total bytes discarded while searching for sync.
    pub fn bytes_skipped(&self) -> u64 {
        self.bytes_skipped
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }

    fn skip_to_sync(&mut self) {
        let skip = self
            .buf
            .iter()
            .position(|&b| b == TS_SYNC_BYTE)
            .unwrap_or(self.buf.len());
        if skip > 0 {
            info!("Skipped {skip} bytes to find the next sync byte");
            self.buf.advance(skip);
            self.bytes_skipped += skip as u64;
        }
    }
}
