// psi/section.rs
//! Generic PSI section reader with CRC-32 (MPEG-2) validation.

use crc::{CRC_32_MPEG_2, Crc};

use crate::error::{Error, Result};

/// Long-form section header fields plus the table body.
pub struct SectionReader<'a> {
    pub table_id:       u8,
    pub version:        u8,
    pub current_next:   bool,
    pub table_id_ext:   u16,       // program_number for PMT, transport_stream_id for PAT
    pub body:           &'a [u8],  // bytes between fixed header & CRC
}

pub const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

impl<'a> SectionReader<'a> {
    /// Validates length and CRC-32 of a section starting at its table_id.
    /// The pointer field must already have been consumed.
    pub fn new(section: &'a [u8]) -> Result<Self> {
        if section.len() < 8 {
            return Err(Error::section("short section"));
        }

        let table_id = section[0];
        if section[1] & 0x80 == 0 {
            return Err(Error::section("section_syntax_indicator not set"));
        }
        let sec_len = (((section[1] & 0x0F) as usize) << 8) | section[2] as usize;
        if sec_len < 9 {
            return Err(Error::section(format!("invalid section_length {sec_len}")));
        }
        let end = 3 + sec_len;
        if end > section.len() {
            return Err(Error::section("truncated section"));
        }

        let crc_calc = CRC_MPEG.checksum(&section[..end - 4]);
        let crc_pkt = u32::from_be_bytes([
            section[end - 4],
            section[end - 3],
            section[end - 2],
            section[end - 1],
        ]);
        if crc_calc != crc_pkt {
            return Err(Error::section(format!(
                "CRC-32 mismatch (calculated {crc_calc:#010x}, found {crc_pkt:#010x})"
            )));
        }

        Ok(Self {
            table_id,
            version:        (section[5] & 0x3E) >> 1,
            current_next:   section[5] & 0x01 != 0,
            table_id_ext:   u16::from_be_bytes([section[3], section[4]]),
            body:           &section[8..end - 4],
        })
    }
}

/// Strips the pointer field from a payload that begins a section.
pub fn skip_pointer_field(payload: &[u8]) -> Result<&[u8]> {
    let pointer = *payload
        .first()
        .ok_or_else(|| Error::section("payload empty"))? as usize;
    payload
        .get(1 + pointer..)
        .ok_or_else(|| Error::section("pointer field past end of payload"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pat_section;

    #[test]
    fn test_reads_header_and_body() {
        let section = pat_section(7, &[(1, 0x100)]);
        let reader = SectionReader::new(&section).unwrap();
        assert_eq!(reader.table_id, 0x00);
        assert_eq!(reader.version, 7);
        assert!(reader.current_next);
        assert_eq!(reader.body, &[0x00, 0x01, 0xE1, 0x00]);
    }

    #[test]
    fn test_crc_mismatch_is_rejected() {
        let mut section = pat_section(0, &[(1, 0x100)]);
        let last = section.len() - 1;
        section[last] ^= 0xFF;
        assert!(matches!(SectionReader::new(&section), Err(Error::Section(_))));
    }

    #[test]
    fn test_pointer_field() {
        assert_eq!(skip_pointer_field(&[2, 0xAA, 0xBB, 0x00]).unwrap(), &[0x00]);
        assert!(skip_pointer_field(&[]).is_err());
        assert!(skip_pointer_field(&[5, 0x00]).is_err());
    }
}
