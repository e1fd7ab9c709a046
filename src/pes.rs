//! PES header parsing.

use std::io;

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::constants::{PES_FIXED_HEADER_SIZE, PES_OPTIONAL_HEADER_SIZE, PES_START_CODE, stream_id};
use crate::error::{Error, Result};

/// Fields of a PES header needed by the decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PesHeader {
    pub stream_id: u8,
    /// PES_packet_length; 0 means unbounded (video).
    pub packet_length: u16,
    /// Bytes from the start code up to the first payload byte.
    pub header_length: usize,
    pub pts: Option<u64>,
    pub dts: Option<u64>,
}

impl PesHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if !data.starts_with(&PES_START_CODE) {
            return Err(Error::pes("missing packet start code prefix"));
        }
        let header = read_header(data).map_err(|_| Error::pes("truncated PES header"))?;
        if header.header_length > data.len() {
            return Err(Error::pes(format!(
                "header length {} exceeds {} available bytes",
                header.header_length,
                data.len()
            )));
        }
        Ok(header)
    }

    /// End of the payload within a PES of `available` bytes.
    pub fn payload_end(&self, available: usize) -> usize {
        if self.packet_length == 0 {
            available
        } else {
            (PES_FIXED_HEADER_SIZE + self.packet_length as usize).min(available)
        }
    }

    /// Payload slice of `data`, the buffer this header was parsed from.
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let end = self.payload_end(data.len());
        data.get(self.header_length..end).unwrap_or(&[])
    }
}

/// Stream ids whose PES packets carry no optional header.
pub fn has_optional_header(id: u8) -> bool {
    !matches!(
        id,
        stream_id::PROGRAM_STREAM_MAP
            | stream_id::PADDING
            | stream_id::PRIVATE_STREAM_2
            | stream_id::ECM
            | stream_id::EMM
            | stream_id::PROGRAM_STREAM_DIRECTORY
            | stream_id::DSMCC
            | stream_id::H222_TYPE_E
    )
}

fn read_header(data: &[u8]) -> io::Result<PesHeader> {
    let mut br = BitReader::endian(data, BigEndian);
    br.skip(24)?; // packet_start_code_prefix
    let stream_id = br.read::<8, u8>()?;
    let packet_length = br.read::<16, u16>()?;

    if !has_optional_header(stream_id) {
        return Ok(PesHeader {
            stream_id,
            packet_length,
            header_length: PES_FIXED_HEADER_SIZE,
            pts: None,
            dts: None,
        });
    }

    if br.read::<2, u8>()? != 0b10 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "bad marker bits"));
    }
    br.skip(6)?; // scrambling, priority, alignment, copyright, original
    let pts_dts_flags = br.read::<2, u8>()?;
    br.skip(6)?; // ESCR, ES rate, trick mode, copy info, CRC, extension
    let header_data_length = br.read::<8, u8>()?;

    let pts = if pts_dts_flags & 0b10 != 0 {
        Some(read_timestamp(&mut br)?)
    } else {
        None
    };
    let dts = if pts_dts_flags == 0b11 {
        Some(read_timestamp(&mut br)?)
    } else {
        None
    };

    Ok(PesHeader {
        stream_id,
        packet_length,
        header_length: PES_OPTIONAL_HEADER_SIZE + header_data_length as usize,
        pts,
        dts,
    })
}

/// 33-bit timestamp split 3/15/15 with marker bits.
fn read_timestamp<R: io::Read>(br: &mut BitReader<R, BigEndian>) -> io::Result<u64> {
    br.skip(4)?;
    let high = br.read::<3, u64>()?;
    br.skip(1)?;
    let mid = br.read::<15, u64>()?;
    br.skip(1)?;
    let low = br.read::<15, u64>()?;
    br.skip(1)?;
    Ok((high << 30) | (mid << 15) | low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pes_packet;

    #[test]
    fn test_parse_pts() {
        let pts = 0x1_2345_6789;
        let pes = pes_packet(0xE0, Some(pts), &[0xAA; 10]);
        let header = PesHeader::parse(&pes).unwrap();
        assert_eq!(header.stream_id, 0xE0);
        assert_eq!(header.header_length, 14);
        assert_eq!(header.pts, Some(pts));
        assert_eq!(header.dts, None);
        assert_eq!(header.payload(&pes), &[0xAA; 10]);
    }

    #[test]
    fn test_parse_without_pts() {
        let pes = pes_packet(stream_id::PRIVATE_STREAM_1, None, &[1, 2, 3]);
        let header = PesHeader::parse(&pes).unwrap();
        assert_eq!(header.header_length, 9);
        assert_eq!(header.pts, None);
        assert_eq!(header.packet_length, 6);
        assert_eq!(header.payload(&pes), &[1, 2, 3]);
    }

    #[test]
    fn test_payload_clipped_to_available() {
        let pes = pes_packet(stream_id::PRIVATE_STREAM_1, None, &[1, 2, 3, 4]);
        let header = PesHeader::parse(&pes[..11]).unwrap();
        assert_eq!(header.payload(&pes[..11]), &[1, 2]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(PesHeader::parse(&[0x00, 0x00, 0x02, 0xE0]).is_err());
        assert!(PesHeader::parse(&[0x00, 0x00, 0x01, 0xE0, 0x00]).is_err());
    }
}
