//! Turns reassembled PES units into application data: H.264 NAL units,
//! MPEG-2 picture types, or validated KLV metadata records.

use serde::Serialize;
use tracing::debug;

use crate::demux::PesPacket;
use crate::error::Result;
use crate::klv::{DecodedKlvPacket, KlvContext, KlvDecoder, decode_metadata_pes};
use crate::parsers::{
    NalUnit, PictureCodingType, parse_mpeg2_seq_hdr, parse_nal_unit, scan_annex_b, scan_picture_types,
};
use crate::pes::PesHeader;
use crate::types::{FrameKind, StreamType, VideoInfo};

/// Splits an Annex-B elementary stream into NAL unit segments.
pub type NalScanner = Box<dyn Fn(&[u8]) -> Vec<&[u8]> + Send>;
/// Parses one segment (no start code) into a NAL unit.
pub type NalParser = Box<dyn Fn(&[u8]) -> Result<NalUnit> + Send>;
/// Decodes a KLV byte run into a context.
pub type KlvPayloadDecoder = Box<dyn Fn(&[u8]) -> Result<KlvContext> + Send>;

/// Result of decoding one PES unit. Every variant carries its source PID.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedStreamData {
    Video {
        pid: u16,
        nal_units: Vec<NalUnit>,
    },
    Mpeg2Video {
        pid: u16,
        pictures: Vec<PictureCodingType>,
        sequence: Option<VideoInfo>,
    },
    Metadata {
        pid: u16,
        packet: DecodedKlvPacket,
    },
}

impl DecodedStreamData {
    pub fn pid(&self) -> u16 {
        match self {
            Self::Video { pid, .. } | Self::Mpeg2Video { pid, .. } | Self::Metadata { pid, .. } => *pid,
        }
    }

    /// Frame boundary marker for the packet buffer; None for metadata.
    pub fn frame_kind(&self) -> Option<FrameKind> {
        match self {
            Self::Video { nal_units, .. } => Some(if nal_units.iter().any(NalUnit::is_idr) {
                FrameKind::Idr
            } else {
                FrameKind::NonIdr
            }),
            Self::Mpeg2Video { pictures, .. } => Some(
                if pictures.iter().all(|p| *p == PictureCodingType::Intra) {
                    FrameKind::Idr
                } else {
                    FrameKind::NonIdr
                },
            ),
            Self::Metadata { .. } => None,
        }
    }

    pub fn is_video(&self) -> bool {
        !matches!(self, Self::Metadata { .. })
    }
}

/// JSON view used by the report and the CLI's metadata output.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedSummary<'a> {
    Video { pid: u16, nal_units: usize, idr: bool },
    Mpeg2Video { pid: u16, pictures: &'a [PictureCodingType] },
    Metadata { pid: u16, pts: i64, klv: &'a KlvContext },
}

impl DecodedStreamData {
    pub fn summary(&self) -> DecodedSummary<'_> {
        match self {
            Self::Video { pid, nal_units } => DecodedSummary::Video {
                pid: *pid,
                nal_units: nal_units.len(),
                idr: nal_units.iter().any(NalUnit::is_idr),
            },
            Self::Mpeg2Video { pid, pictures, .. } => DecodedSummary::Mpeg2Video { pid: *pid, pictures },
            Self::Metadata { pid, packet } => DecodedSummary::Metadata {
                pid: *pid,
                pts: packet.pts,
                klv: &packet.context,
            },
        }
    }
}

pub struct ApplicationDataDecoder {
    scanner: NalScanner,
    parser: NalParser,
    klv: KlvPayloadDecoder,
    klv_enabled: bool,
}

impl ApplicationDataDecoder {
    /// Annex-B scanning, the built-in NAL parser and the ST 0601 KLV decoder.
    pub fn new(klv_enabled: bool) -> Self {
        let klv = KlvDecoder::st0601();
        Self::with_strategies(
            Box::new(scan_annex_b),
            Box::new(parse_nal_unit),
            Box::new(move |bytes: &[u8]| -> Result<KlvContext> { Ok(klv.decode(bytes)?) }),
            klv_enabled,
        )
    }

    pub fn with_strategies(
        scanner: NalScanner,
        parser: NalParser,
        klv: KlvPayloadDecoder,
        klv_enabled: bool,
    ) -> Self {
        Self { scanner, parser, klv, klv_enabled }
    }

    pub fn klv_enabled(&self) -> bool {
        self.klv_enabled
    }

    /// Ok(None) for stream types this decoder does not handle and for
    /// metadata units without KLV.
    pub fn decode(&self, pes: &PesPacket) -> Result<Option<DecodedStreamData>> {
        match pes.stream_type {
            t if t.is_metadata() => {
                if !self.klv_enabled {
                    return Ok(None);
                }
                let packet = decode_metadata_pes(&pes.payload, &self.klv)?;
                Ok(packet.map(|packet| DecodedStreamData::Metadata { pid: pes.pid, packet }))
            }
            StreamType::H264 => {
                let es = PesHeader::parse(&pes.payload)?.payload(&pes.payload);
                Ok(Some(DecodedStreamData::Video { pid: pes.pid, nal_units: self.parse_nal_units(es) }))
            }
            StreamType::Mpeg2Video => {
                let es = PesHeader::parse(&pes.payload)?.payload(&pes.payload);
                Ok(Some(DecodedStreamData::Mpeg2Video {
                    pid: pes.pid,
                    pictures: scan_picture_types(es),
                    sequence: parse_mpeg2_seq_hdr(es),
                }))
            }
            _ => Ok(None),
        }
    }

    fn parse_nal_units(&self, es: &[u8]) -> Vec<NalUnit> {
        (self.scanner)(es)
            .into_iter()
            .filter_map(|segment| match (self.parser)(segment) {
                Ok(nal) => Some(nal),
                Err(e) => {
                    debug!("Skipping NAL segment of {} bytes: {e}", segment.len());
                    None
                }
            })
            .collect()
    }
}

impl Default for ApplicationDataDecoder {
    fn default() -> Self {
        Self::new(true)
    }
}
