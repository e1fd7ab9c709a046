use crate::error::{Error, Result};
use crate::psi::section::SectionReader;

/// ─────────── PMT ───────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtSection {
    pub version:        u8,
    pub program_number: u16,
    pub pcr_pid:        u16,
    pub streams:        Vec<StreamInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub stream_type:    u8,
    pub elementary_pid: u16,
    pub descriptors:    Vec<u8>,
}

/// Parses a PMT section (pointer field already removed).
pub fn parse_pmt(section: &[u8]) -> Result<PmtSection> {
    let sec = SectionReader::new(section)?;
    if sec.table_id != 0x02 {
        return Err(Error::section(format!("table_id {:#04x} is not a PMT", sec.table_id)));
    }
    let b = sec.body;
    if b.len() < 4 {
        return Err(Error::section("PMT body too short"));
    }

    // fixed header inside the body
    let pcr_pid       = (((b[0] & 0x1F) as u16) << 8) | (b[1] as u16);
    let prog_info_len = (((b[2] & 0x0F) as usize) << 8) | (b[3] as usize);
    let mut idx       = 4 + prog_info_len;             // skip program descriptors

    // ES loop
    let mut streams = Vec::new();
    while idx + 5 <= b.len() {
        let stype = b[idx];
        let pid   = (((b[idx + 1] & 0x1F) as u16) << 8) | (b[idx + 2] as u16);
        let eslen = (((b[idx + 3] & 0x0F) as usize) << 8) | (b[idx + 4] as usize);
        let end   = (idx + 5 + eslen).min(b.len());
        streams.push(StreamInfo {
            stream_type:    stype,
            elementary_pid: pid,
            descriptors:    b[idx + 5..end].to_vec(),
        });
        idx += 5 + eslen;
    }

    Ok(PmtSection {
        version:        sec.version,
        program_number: sec.table_id_ext,
        pcr_pid,
        streams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pmt_section;

    #[test]
    fn test_parse_pmt_streams() {
        let section = pmt_section(1, 0x101, &[(0x1B, 0x101), (0x15, 0x102)]);
        let pmt = parse_pmt(&section).unwrap();
        assert_eq!(pmt.program_number, 1);
        assert_eq!(pmt.pcr_pid, 0x101);
        let pids: Vec<(u8, u16)> =
            pmt.streams.iter().map(|s| (s.stream_type, s.elementary_pid)).collect();
        assert_eq!(pids, vec![(0x1B, 0x101), (0x15, 0x102)]);
    }

    #[test]
    fn test_parse_pmt_rejects_pat() {
        let section = crate::test_support::pat_section(0, &[(1, 0x100)]);
        assert!(parse_pmt(&section).is_err());
    }
}
