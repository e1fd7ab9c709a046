//! H.264 Annex-B scanning and NAL unit headers.

use bitstream_io::{BigEndian, BitRead, BitReader};
use bytes::Bytes;
use serde::Serialize;

use super::utils::{remove_ep, start_code_positions, ue};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NalUnitType {
    NonIdrSlice,
    PartitionA,
    PartitionB,
    PartitionC,
    IdrSlice,
    Sei,
    Sps,
    Pps,
    AccessUnitDelimiter,
    EndOfSequence,
    EndOfStream,
    Filler,
    Other(u8),
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value & 0x1F {
            1 => Self::NonIdrSlice,
            2 => Self::PartitionA,
            3 => Self::PartitionB,
            4 => Self::PartitionC,
            5 => Self::IdrSlice,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::AccessUnitDelimiter,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::Filler,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SliceType {
    P,
    B,
    I,
    Sp,
    Si,
}

impl SliceType {
    fn from_ue(value: u32) -> Self {
        match value % 5 {
            0 => Self::P,
            1 => Self::B,
            2 => Self::I,
            3 => Self::Sp,
            _ => Self::Si,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliceHeader {
    pub first_mb_in_slice: u32,
    pub slice_type: SliceType,
}

/// A NAL unit without its start code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalUnit {
    pub nal_ref_idc: u8,
    pub nal_type: NalUnitType,
    /// Present for coded slices whose header could be read.
    pub slice: Option<SliceHeader>,
    pub data: Bytes,
}

impl NalUnit {
    pub fn is_idr(&self) -> bool {
        self.nal_type == NalUnitType::IdrSlice
    }

    /// Payload after the one-byte header, emulation prevention removed.
    pub fn rbsp(&self) -> Vec<u8> {
        remove_ep(self.data.get(1..).unwrap_or(&[]))
    }
}

/// Splits an Annex-B byte stream into NAL unit segments. Both 3- and 4-byte
/// start codes are accepted; zero bytes before a start code are trimmed from
/// the preceding segment.
pub fn scan_annex_b(data: &[u8]) -> Vec<&[u8]> {
    let starts = start_code_positions(data);
    let mut segments = Vec::with_capacity(starts.len());
    for (k, &start) in starts.iter().enumerate() {
        let begin = start + 3;
        let mut end = starts.get(k + 1).copied().unwrap_or(data.len());
        while end > begin && data[end - 1] == 0 {
            end -= 1;
        }
        if end > begin {
            segments.push(&data[begin..end]);
        }
    }
    segments
}

/// Reads the NAL header and, for coded slices, the start of the slice header.
pub fn parse_nal_unit(segment: &[u8]) -> Result<NalUnit> {
    let header = *segment.first().ok_or_else(|| Error::nal("empty segment"))?;
    let mut br = BitReader::endian(&segment[..1], BigEndian);
    let forbidden = br.read::<1, u8>().map_err(|_| Error::nal("short header"))?;
    if forbidden != 0 {
        return Err(Error::nal(format!("forbidden_zero_bit set in {header:#04x}")));
    }
    let nal_ref_idc = br.read::<2, u8>().map_err(|_| Error::nal("short header"))?;
    let nal_type = NalUnitType::from(header);

    let slice = match nal_type {
        NalUnitType::NonIdrSlice | NalUnitType::IdrSlice => {
            // first_mb_in_slice and slice_type fit well inside 16 bytes
            let end = segment.len().min(17);
            read_slice_header(&remove_ep(&segment[1..end]))
        }
        _ => None,
    };

    Ok(NalUnit { nal_ref_idc, nal_type, slice, data: Bytes::copy_from_slice(segment) })
}

fn read_slice_header(rbsp: &[u8]) -> Option<SliceHeader> {
    let mut br = BitReader::endian(rbsp, BigEndian);
    let first_mb_in_slice = ue(&mut br)?;
    let slice_type = SliceType::from_ue(ue(&mut br)?);
    Some(SliceHeader { first_mb_in_slice, slice_type })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mixed_start_codes() {
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, // SPS, 4-byte start code
            0x00, 0x00, 0x01, 0x68, 0xCE, // PPS, 3-byte start code
            0x00, 0x00, 0x00, 0x00, 0x01, 0x65, 0x88, // IDR, extra leading zero
        ];
        let segments = scan_annex_b(&data);
        assert_eq!(segments, vec![&[0x67, 0x42][..], &[0x68, 0xCE][..], &[0x65, 0x88][..]]);
    }

    #[test]
    fn test_scan_without_start_code() {
        assert!(scan_annex_b(&[0x65, 0x88, 0x00]).is_empty());
    }

    #[test]
    fn test_parse_idr_slice() {
        // first_mb_in_slice = 0 ("1"), slice_type = 7 ("0001000") -> I
        let nal = parse_nal_unit(&[0x65, 0b1000_1000, 0x00]).unwrap();
        assert!(nal.is_idr());
        assert_eq!(nal.nal_ref_idc, 3);
        assert_eq!(
            nal.slice,
            Some(SliceHeader { first_mb_in_slice: 0, slice_type: SliceType::I })
        );
    }

    #[test]
    fn test_parse_rejects_forbidden_bit() {
        assert!(parse_nal_unit(&[0x85]).is_err());
        assert!(parse_nal_unit(&[]).is_err());
        let sei = parse_nal_unit(&[0x06, 0x05]).unwrap();
        assert_eq!(sei.nal_type, NalUnitType::Sei);
        assert!(sei.slice.is_none());
    }
}
