//! MPEG-2 video picture headers.

use bitstream_io::{BigEndian, BitRead, BitReader};
use serde::Serialize;

use super::utils::start_code_positions;
use crate::types::VideoInfo;

const PICTURE_START_CODE: u8 = 0x00;
const SEQUENCE_HEADER_CODE: u8 = 0xB3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PictureCodingType {
    Intra,
    Predictive,
    Bidirectional,
    Other(u8),
}

impl PictureCodingType {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => Self::Intra,
            2 => Self::Predictive,
            3 => Self::Bidirectional,
            other => Self::Other(other),
        }
    }
}

/// picture_coding_type of every picture header in an elementary stream chunk.
pub fn scan_picture_types(data: &[u8]) -> Vec<PictureCodingType> {
    start_code_positions(data)
        .into_iter()
        .filter(|&pos| data.get(pos + 3) == Some(&PICTURE_START_CODE))
        .filter_map(|pos| {
            let header = data.get(pos + 4..pos + 6)?;
            let mut br = BitReader::endian(header, BigEndian);
            br.skip(10).ok()?; // temporal_reference
            let coding_type = br.read::<3, u8>().ok()?;
            Some(PictureCodingType::from_bits(coding_type))
        })
        .collect()
}

/// Parse MPEG-2 sequence header for video parameters
pub fn parse_mpeg2_seq_hdr(data: &[u8]) -> Option<VideoInfo> {
    let pos = start_code_positions(data)
        .into_iter()
        .find(|&pos| data.get(pos + 3) == Some(&SEQUENCE_HEADER_CODE))?;
    let seq_hdr = data.get(pos + 4..pos + 8)?;

    let horizontal_size = ((seq_hdr[0] as u16) << 4) | ((seq_hdr[1] as u16) >> 4);
    let vertical_size = ((seq_hdr[1] as u16 & 0x0F) << 8) | (seq_hdr[2] as u16);
    let fps = match seq_hdr[3] & 0x0F {
        1 => 23.976,
        2 => 24.0,
        3 => 25.0,
        4 => 29.97,
        5 => 30.0,
        6 => 50.0,
        7 => 59.94,
        8 => 60.0,
        _ => 0.0,
    };

    Some(VideoInfo {
        codec: "MPEG-2".to_string(),
        width: horizontal_size,
        height: vertical_size,
        fps,
        chroma: "4:2:0".to_string(),
    })
}
