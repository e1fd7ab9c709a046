//! Statistics for an ingest session

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::buffer::BufferStats;
use crate::decoder::DecodedStreamData;
use crate::error::Error;
use crate::packet::TransportPacket;
use crate::parsers::{NalUnitType, parse_avc_sps};
use crate::types::{FrameKind, StreamType, VideoInfo};

/// Rolling counters for one elementary stream
#[derive(Debug, Clone)]
pub struct EsStats {
    pub stream_type: StreamType,
    pub packets: u64,
    pub bytes: u64,
    pub pes_units: u64,
    pub frames: u64,
    pub idr_frames: u64,
    pub klv_records: u64,
    pub klv_failures: u64,
    pub decode_failures: u64,
    pub continuity_errors: u64,
    pub transport_errors: u64,
    pub last_cc: Option<u8>,
    pub last_pts: Option<i64>,
    pub video: Option<VideoInfo>,
    pub start: Instant,
    pub last_seen: Instant,
}

impl EsStats {
    fn new(stream_type: StreamType) -> Self {
        let now = Instant::now();
        Self {
            stream_type,
            packets: 0,
            bytes: 0,
            pes_units: 0,
            frames: 0,
            idr_frames: 0,
            klv_records: 0,
            klv_failures: 0,
            decode_failures: 0,
            continuity_errors: 0,
            transport_errors: 0,
            last_cc: None,
            last_pts: None,
            video: None,
            start: now,
            last_seen: now,
        }
    }

    /// Bitrate in kbps since the stream was first seen
    pub fn bitrate_kbps(&self) -> f64 {
        let seconds = self.start.elapsed().as_secs_f64().max(0.1);
        (self.bytes as f64 * 8.0 / 1000.0) / seconds
    }
}

/// Tracks per-PID statistics and session-wide failure counts
#[derive(Debug, Default)]
pub struct StreamStats {
    es_stats: HashMap<u16, EsStats>,
    resync_bytes: u64,
    table_errors: u64,
    buffer_errors: u64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one transport packet of an elementary stream
    pub fn record_packet(&mut self, pid: u16, stream_type: StreamType, bytes: usize) {
        let stats = self.es_stats.entry(pid).or_insert_with(|| EsStats::new(stream_type));
        stats.stream_type = stream_type;
        stats.packets += 1;
        stats.bytes += bytes as u64;
        stats.last_seen = Instant::now();
    }

    /// Checks the continuity counter and error indicator of a packet on a
    /// stream already seen. Packets without payload do not advance the
    /// counter and one duplicate is allowed.
    pub fn record_continuity(&mut self, packet: &TransportPacket) {
        let Some(stats) = self.es_stats.get_mut(&packet.pid()) else {
            return;
        };
        if packet.transport_error() {
            stats.transport_errors += 1;
        }
        if !packet.has_payload() {
            return;
        }
        let cc = packet.continuity_counter();
        if let Some(last) = stats.last_cc {
            if cc != last && cc != (last + 1) & 0x0F {
                stats.continuity_errors += 1;
            }
        }
        stats.last_cc = Some(cc);
    }

    pub fn record_pes(&mut self, pid: u16) {
        if let Some(stats) = self.es_stats.get_mut(&pid) {
            stats.pes_units += 1;
        }
    }

    pub fn record_decoded(&mut self, data: &DecodedStreamData) {
        let Some(stats) = self.es_stats.get_mut(&data.pid()) else {
            return;
        };
        match data.frame_kind() {
            Some(kind) => {
                stats.frames += 1;
                if kind == FrameKind::Idr {
                    stats.idr_frames += 1;
                }
            }
            None => stats.klv_records += 1,
        }
        match data {
            DecodedStreamData::Video { nal_units, .. } => {
                if let Some(info) = nal_units
                    .iter()
                    .filter(|n| n.nal_type == NalUnitType::Sps)
                    .find_map(|n| parse_avc_sps(&n.rbsp()))
                {
                    stats.video = Some(info);
                }
            }
            DecodedStreamData::Mpeg2Video { sequence: Some(info), .. } => stats.video = Some(info.clone()),
            DecodedStreamData::Metadata { packet, .. } => stats.last_pts = Some(packet.pts),
            _ => {}
        }
    }

    pub fn record_decode_failure(&mut self, pid: u16, error: &Error) {
        if let Some(stats) = self.es_stats.get_mut(&pid) {
            match error {
                Error::Klv(_) => stats.klv_failures += 1,
                _ => stats.decode_failures += 1,
            }
        }
    }

    pub fn record_resync(&mut self, skipped: u64) {
        self.resync_bytes += skipped;
    }

    pub fn record_table_error(&mut self) {
        self.table_errors += 1;
    }

    /// A failed write or flush of the packet buffer.
    pub fn record_buffer_error(&mut self) {
        self.buffer_errors += 1;
    }

    pub fn buffer_errors(&self) -> u64 {
        self.buffer_errors
    }

    pub fn get(&self, pid: u16) -> Option<&EsStats> {
        self.es_stats.get(&pid)
    }

    /// Remove streams not seen for longer than `timeout`
    pub fn cleanup_old_streams(&mut self, timeout: Duration) {
        self.es_stats.retain(|_, stats| stats.last_seen.elapsed() < timeout);
    }

    pub fn snapshot(&self, buffer: BufferStats) -> StatsSnapshot {
        let mut streams: Vec<EsSnapshot> = self
            .es_stats
            .iter()
            .map(|(&pid, s)| EsSnapshot {
                pid,
                stream_type: s.stream_type.tag(),
                bitrate_kbps: s.bitrate_kbps(),
                packets: s.packets,
                pes_units: s.pes_units,
                frames: (s.frames > 0).then_some(s.frames),
                idr_frames: (s.frames > 0).then_some(s.idr_frames),
                klv_records: (s.klv_records > 0).then_some(s.klv_records),
                klv_failures: (s.klv_failures > 0).then_some(s.klv_failures),
                decode_failures: s.decode_failures,
                continuity_errors: s.continuity_errors,
                transport_errors: s.transport_errors,
                last_pts: s.last_pts,
                width: s.video.as_ref().map(|v| v.width),
                height: s.video.as_ref().map(|v| v.height),
                fps: s.video.as_ref().map(|v| v.fps).filter(|fps| *fps > 0.0),
                chroma: s.video.as_ref().map(|v| v.chroma.clone()),
            })
            .collect();
        streams.sort_by_key(|s| s.pid);

        StatsSnapshot {
            ts_time: chrono::Utc::now().to_rfc3339(),
            resync_bytes: self.resync_bytes,
            table_errors: self.table_errors,
            buffer_errors: self.buffer_errors,
            buffer,
            streams,
        }
    }
}

/// JSON structure for one elementary stream
#[derive(Debug, Serialize)]
pub struct EsSnapshot {
    pub pid: u16,
    pub stream_type: u8,
    pub bitrate_kbps: f64,
    pub packets: u64,
    pub pes_units: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idr_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub klv_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub klv_failures: Option<u64>,
    pub decode_failures: u64,
    pub continuity_errors: u64,
    pub transport_errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chroma: Option<String>,
}

/// JSON structure for the complete report
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub ts_time: String,
    pub resync_bytes: u64,
    pub table_errors: u64,
    pub buffer_errors: u64,
    pub buffer: BufferStats,
    pub streams: Vec<EsSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KlvError;
    use crate::klv::{DecodedKlvPacket, KlvContext};
    use crate::parsers::parse_nal_unit;

    #[test]
    fn test_video_counters_and_sps() {
        let mut stats = StreamStats::new();
        stats.record_packet(0x100, StreamType::H264, 188);
        stats.record_pes(0x100);

        let sps = parse_nal_unit(&[0x67, 0x42, 0x00, 0x1E, 0xDA, 0x05, 0x07, 0xE0]).unwrap();
        let idr = parse_nal_unit(&[0x65, 0x88]).unwrap();
        stats.record_decoded(&DecodedStreamData::Video { pid: 0x100, nal_units: vec![sps, idr] });

        let es = stats.get(0x100).unwrap();
        assert_eq!((es.packets, es.pes_units, es.frames, es.idr_frames), (1, 1, 1, 1));
        let video = es.video.as_ref().unwrap();
        assert_eq!((video.width, video.height), (320, 240));
    }

    #[test]
    fn test_metadata_counters() {
        let mut stats = StreamStats::new();
        stats.record_packet(0x101, StreamType::MetadataPes, 188);
        let packet = DecodedKlvPacket { pts: 900, context: KlvContext::new() };
        stats.record_decoded(&DecodedStreamData::Metadata { pid: 0x101, packet });
        stats.record_decode_failure(0x101, &Error::Klv(KlvError::MissingChecksum));
        stats.record_decode_failure(0x101, &Error::pes("truncated PES header"));

        let es = stats.get(0x101).unwrap();
        assert_eq!((es.klv_records, es.klv_failures, es.decode_failures), (1, 1, 1));
        assert_eq!(es.last_pts, Some(900));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut stats = StreamStats::new();
        stats.record_packet(0x101, StreamType::MetadataPes, 188);
        stats.record_packet(0x100, StreamType::H264, 188);
        stats.record_resync(3);

        let snapshot = stats.snapshot(BufferStats::default());
        assert_eq!(snapshot.streams.iter().map(|s| s.pid).collect::<Vec<_>>(), vec![0x100, 0x101]);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["resync_bytes"], 3);
        assert_eq!(json["buffer_errors"], 0);
        assert_eq!(json["streams"][0]["stream_type"], 0x1B);
        assert!(json["streams"][0].get("width").is_none());
    }

    #[test]
    fn test_continuity_errors() {
        use crate::test_support::payload_packet;
        use bytes::Bytes;

        let packet = |cc: u8| TransportPacket::parse(Bytes::from(payload_packet(0x100, false, cc, &[0; 10]))).unwrap();
        let mut stats = StreamStats::new();
        stats.record_packet(0x100, StreamType::H264, 188);
        for cc in [14, 15, 0, 0, 1, 3, 4] {
            stats.record_continuity(&packet(cc));
        }
        // 0 -> 0 is a duplicate, 1 -> 3 skips a packet
        let es = stats.get(0x100).unwrap();
        assert_eq!((es.continuity_errors, es.transport_errors), (1, 0));

        // unknown PIDs are not tracked
        stats.record_continuity(&TransportPacket::parse(Bytes::from(payload_packet(0x200, false, 5, &[]))).unwrap());
        assert!(stats.get(0x200).is_none());
    }

    #[test]
    fn test_cleanup_old_streams() {
        let mut stats = StreamStats::new();
        stats.record_packet(0x100, StreamType::H264, 188);
        stats.cleanup_old_streams(Duration::ZERO);
        assert!(stats.get(0x100).is_none());
    }
}
