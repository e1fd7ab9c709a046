//! Per-session packet processing: framing, demultiplexing, decoding and
//! buffering of one UDP transport stream.

mod rotator;

pub use rotator::{DirectoryRolloverAction, RolloverAction, StreamRotator};

use std::io;
use std::sync::Arc;

use tracing::{error, warn};

use crate::buffer::SharedPacketBuffer;
use crate::constants::TS_PACKET_SIZE;
use crate::decoder::{ApplicationDataDecoder, DecodedStreamData};
use crate::demux::{PesPacket, ProgramTableTracker, TsDemuxer};
use crate::error::{Error, Result};
use crate::framer::SyncFramer;
use crate::stats::StreamStats;

/// Receives decoded video and metadata.
pub trait StreamDataSink: Send {
    fn accept(&mut self, data: &DecodedStreamData);
}

impl<F> StreamDataSink for F
where
    F: FnMut(&DecodedStreamData) + Send,
{
    fn accept(&mut self, data: &DecodedStreamData) {
        self(data)
    }
}

pub struct StreamProcessor {
    framer: SyncFramer,
    demuxer: TsDemuxer,
    decoder: ApplicationDataDecoder,
    buffer: SharedPacketBuffer,
    sink: Box<dyn StreamDataSink>,
    stats: StreamStats,
    skipped_seen: u64,
}

impl StreamProcessor {
    pub fn new(
        decoder: ApplicationDataDecoder,
        buffer: SharedPacketBuffer,
        sink: impl StreamDataSink + 'static,
    ) -> Self {
        Self {
            framer: SyncFramer::new(),
            demuxer: TsDemuxer::new(),
            decoder,
            buffer,
            sink: Box::new(sink),
            stats: StreamStats::new(),
            skipped_seen: 0,
        }
    }

    /// Replaces the default PAT/PMT parsers.
    pub fn with_tables(mut self, tables: ProgramTableTracker) -> Self {
        self.demuxer = TsDemuxer::with_tables(tables);
        self
    }

    /// Processes one datagram. Every packet is buffered before it is
    /// demultiplexed. An empty PAT does not stop the datagram; it is
    /// returned as [`Error::NoPrograms`] once the remaining packets are done.
    /// Buffer write failures are logged and counted, never returned.
    pub fn process_datagram(&mut self, datagram: &[u8]) -> Result<()> {
        let packets = self.framer.push(datagram);
        let skipped = self.framer.bytes_skipped();
        self.stats.record_resync(skipped - self.skipped_seen);
        self.skipped_seen = skipped;

        let mut deferred = None;
        for packet in packets {
            let buffered = self.buffer.lock().write(packet.as_bytes());
            if let Err(e) = buffered {
                self.buffer_failed(e);
            }

            let pid = packet.pid();
            if self.demuxer.tables().is_elementary_stream(pid) {
                if let Some(stream_type) = self.demuxer.tables().stream_type(pid) {
                    self.stats.record_packet(pid, stream_type, TS_PACKET_SIZE);
                    self.stats.record_continuity(&packet);
                }
            }

            match self.demuxer.read(&packet) {
                Ok(Some(pes)) => self.handle_pes(pes),
                Ok(None) => {}
                Err(Error::NoPrograms) => {
                    warn!("{}", Error::NoPrograms);
                    self.stats.record_table_error();
                    deferred.get_or_insert(Error::NoPrograms);
                }
                Err(e) => {
                    warn!("Unable to read program table on PID {pid:#06x}: {e}");
                    self.stats.record_table_error();
                }
            }
        }
        deferred.map_or(Ok(()), Err)
    }

    /// Decodes the units still pending at end of stream.
    pub fn finish(&mut self) {
        for pes in self.demuxer.finish() {
            self.handle_pes(pes);
        }
    }

    fn handle_pes(&mut self, pes: PesPacket) {
        self.stats.record_pes(pes.pid);
        match self.decoder.decode(&pes) {
            Ok(Some(data)) => {
                self.stats.record_decoded(&data);
                if let Some(kind) = data.frame_kind() {
                    let flushed = self.buffer.lock().frame_complete(kind);
                    if let Err(e) = flushed {
                        self.buffer_failed(e);
                    }
                }
                self.sink.accept(&data);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Unable to decode PES on PID {:#06x}: {e}", pes.pid);
                self.stats.record_decode_failure(pes.pid, &e);
            }
        }
    }

    fn buffer_failed(&mut self, e: io::Error) {
        error!("Unable to write buffered transport stream: {e}");
        self.stats.record_buffer_error();
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StreamStats {
        &mut self.stats
    }

    pub fn tables(&self) -> &ProgramTableTracker {
        self.demuxer.tables()
    }

    pub fn buffer(&self) -> SharedPacketBuffer {
        Arc::clone(&self.buffer)
    }

    /// Drops framing, table and reassembly state; the buffer is untouched.
    pub fn reset(&mut self) {
        self.framer.reset();
        self.demuxer.reset();
    }
}
