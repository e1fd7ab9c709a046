use crate::error::{Error, Result};
use crate::psi::section::SectionReader;

/// ─────────── PAT ───────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatSection {
    pub version:      u8,
    pub current_next: bool,
    pub programs:     Vec<PatEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatEntry {
    pub program_number: u16,
    pub pmt_pid:        u16,
}

/// Parses a PAT section (pointer field already removed). Program 0 names the
/// network PID and is not listed.
pub fn parse_pat(section: &[u8]) -> Result<PatSection> {
    let sec = SectionReader::new(section)?;
    if sec.table_id != 0x00 {
        return Err(Error::section(format!("table_id {:#04x} is not a PAT", sec.table_id)));
    }

    let programs = sec
        .body
        .chunks_exact(4)
        .filter_map(|entry| {
            let program_number = u16::from_be_bytes([entry[0], entry[1]]);
            let pmt_pid = (((entry[2] & 0x1F) as u16) << 8) | (entry[3] as u16);
            (program_number != 0).then_some(PatEntry { program_number, pmt_pid })
        })
        .collect();

    Ok(PatSection { version: sec.version, current_next: sec.current_next, programs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pat_section;

    #[test]
    fn test_parse_pat_skips_network_pid() {
        let section = pat_section(3, &[(0, 0x10), (1, 0x100), (2, 0x200)]);
        let pat = parse_pat(&section).unwrap();
        assert_eq!(pat.version, 3);
        assert_eq!(
            pat.programs,
            vec![
                PatEntry { program_number: 1, pmt_pid: 0x100 },
                PatEntry { program_number: 2, pmt_pid: 0x200 },
            ]
        );
    }
}
