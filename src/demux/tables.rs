//! PAT / PMT tracking.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::constants::pid;
use crate::error::{Error, Result};
use crate::psi::{PatSection, PmtSection, parse_pat, parse_pmt, skip_pointer_field};
use crate::types::StreamType;

/// Parses a PAT section starting at its table_id.
pub type PatParser = Box<dyn Fn(&[u8]) -> Result<PatSection> + Send>;
/// Parses a PMT section starting at its table_id.
pub type PmtParser = Box<dyn Fn(&[u8]) -> Result<PmtSection> + Send>;

/// What a PID means under the current program tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketRole {
    ProgramAssociation,
    ProgramMap,
    Elementary(StreamType),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStream {
    pub pid: u16,
    pub stream_type: StreamType,
    pub program_number: u16,
    /// PMT PID that declared this stream.
    pub pmt_pid: u16,
}

/// Builds the PID → stream-type map from PAT and PMT sections.
pub struct ProgramTableTracker {
    pat_parser: PatParser,
    pmt_parser: PmtParser,
    pmt_pids: HashMap<u16, u16>, // pmt_pid -> program_number
    streams: HashMap<u16, ElementaryStream>,
    pat_version: Option<u8>,
    pmt_versions: HashMap<u16, u8>,
}

impl ProgramTableTracker {
    pub fn new() -> Self {
        Self::with_parsers(Box::new(parse_pat), Box::new(parse_pmt))
    }

    pub fn with_parsers(pat_parser: PatParser, pmt_parser: PmtParser) -> Self {
        Self {
            pat_parser,
            pmt_parser,
            pmt_pids: HashMap::new(),
            streams: HashMap::new(),
            pat_version: None,
            pmt_versions: HashMap::new(),
        }
    }

    pub fn classify(&self, packet_pid: u16) -> PacketRole {
        if packet_pid == pid::PAT {
            PacketRole::ProgramAssociation
        } else if self.pmt_pids.contains_key(&packet_pid) {
            PacketRole::ProgramMap
        } else if let Some(stream) = self.streams.get(&packet_pid) {
            PacketRole::Elementary(stream.stream_type)
        } else {
            PacketRole::Ignored
        }
    }

    /// True only for PIDs declared by a current PMT that are neither the PAT
    /// PID nor a PMT PID.
    pub fn is_elementary_stream(&self, packet_pid: u16) -> bool {
        matches!(self.classify(packet_pid), PacketRole::Elementary(_))
    }

    pub fn stream_type(&self, packet_pid: u16) -> Option<StreamType> {
        match self.classify(packet_pid) {
            PacketRole::Elementary(stream_type) => Some(stream_type),
            _ => None,
        }
    }

    /// Replaces the PMT PID set from a PAT payload (pointer field included).
    pub fn handle_pat(&mut self, payload: &[u8]) -> Result<()> {
        let pat = (self.pat_parser)(skip_pointer_field(payload)?)?;

        if self.pat_version != Some(pat.version) {
            info!("PAT version {} with {} program(s)", pat.version, pat.programs.len());
            self.pat_version = Some(pat.version);
        }

        self.pmt_pids = pat
            .programs
            .iter()
            .map(|entry| (entry.pmt_pid, entry.program_number))
            .collect();
        self.streams.retain(|_, s| self.pmt_pids.contains_key(&s.pmt_pid));
        self.pmt_versions.retain(|p, _| self.pmt_pids.contains_key(p));

        if self.pmt_pids.is_empty() {
            return Err(Error::NoPrograms);
        }
        Ok(())
    }

    /// Replaces the streams declared by `pmt_pid` from a PMT payload.
    pub fn handle_pmt(&mut self, pmt_pid: u16, payload: &[u8]) -> Result<()> {
        let pmt = (self.pmt_parser)(skip_pointer_field(payload)?)?;

        if self.pmt_versions.insert(pmt_pid, pmt.version) != Some(pmt.version) {
            info!(
                "PMT version {} on PID {pmt_pid:#06x}: program {} with {} stream(s)",
                pmt.version,
                pmt.program_number,
                pmt.streams.len()
            );
        }

        self.streams.retain(|_, s| s.pmt_pid != pmt_pid);
        for info in &pmt.streams {
            let stream_type = StreamType::from_tag(info.stream_type);
            debug!("PID {:#06x} carries {stream_type:?}", info.elementary_pid);
            self.streams.insert(
                info.elementary_pid,
                ElementaryStream {
                    pid: info.elementary_pid,
                    stream_type,
                    program_number: pmt.program_number,
                    pmt_pid,
                },
            );
        }
        Ok(())
    }

    /// Current elementary streams, ordered by PID.
    pub fn program_map(&self) -> Vec<&ElementaryStream> {
        let mut streams: Vec<_> = self.streams.values().collect();
        streams.sort_by_key(|s| s.pid);
        streams
    }

    pub fn pmt_pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.pmt_pids.keys().copied()
    }

    pub fn reset(&mut self) {
        self.pmt_pids.clear();
        self.streams.clear();
        self.pat_version = None;
        self.pmt_versions.clear();
    }
}

impl Default for ProgramTableTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::{PatEntry, StreamInfo};
    use crate::test_support::{pat_section, pmt_section};

    fn with_pointer(section: Vec<u8>) -> Vec<u8> {
        let mut payload = vec![0x00];
        payload.extend(section);
        payload
    }

    #[test]
    fn test_empty_pat_fails() {
        let mut tracker = ProgramTableTracker::new();
        let err = tracker.handle_pat(&with_pointer(pat_section(0, &[]))).unwrap_err();
        assert!(matches!(err, Error::NoPrograms));
        assert!(err.is_io());
    }

    #[test]
    fn test_empty_pat_from_injected_parser_fails() {
        let mut tracker = ProgramTableTracker::with_parsers(
            Box::new(|_| Ok(PatSection { version: 0, current_next: true, programs: vec![] })),
            Box::new(parse_pmt),
        );
        assert!(matches!(tracker.handle_pat(&[0x00, 0xAB]), Err(Error::NoPrograms)));
    }

    #[test]
    fn test_membership_follows_tables() {
        let mut tracker = ProgramTableTracker::new();
        tracker.handle_pat(&with_pointer(pat_section(0, &[(1, 0x100)]))).unwrap();
        assert_eq!(tracker.classify(0x100), PacketRole::ProgramMap);
        assert!(!tracker.is_elementary_stream(0x101));

        tracker
            .handle_pmt(0x100, &with_pointer(pmt_section(1, 0x101, &[(0x1B, 0x101), (0x15, 0x102)])))
            .unwrap();
        assert_eq!(tracker.stream_type(0x101), Some(StreamType::H264));
        assert_eq!(tracker.stream_type(0x102), Some(StreamType::MetadataPes));
        assert!(!tracker.is_elementary_stream(0x0000));
        assert!(!tracker.is_elementary_stream(0x100));
        assert!(!tracker.is_elementary_stream(0x200));
        assert_eq!(tracker.program_map().len(), 2);
    }

    #[test]
    fn test_new_pat_drops_streams_of_removed_programs() {
        let mut tracker = ProgramTableTracker::new();
        tracker.handle_pat(&with_pointer(pat_section(0, &[(1, 0x100)]))).unwrap();
        tracker
            .handle_pmt(0x100, &with_pointer(pmt_section(1, 0x101, &[(0x1B, 0x101)])))
            .unwrap();

        tracker.handle_pat(&with_pointer(pat_section(1, &[(2, 0x200)]))).unwrap();
        assert_eq!(tracker.classify(0x100), PacketRole::Ignored);
        assert!(!tracker.is_elementary_stream(0x101));
    }

    #[test]
    fn test_pmt_pid_is_never_elementary() {
        let mut tracker = ProgramTableTracker::with_parsers(
            Box::new(|_| {
                Ok(PatSection {
                    version: 0,
                    current_next: true,
                    programs: vec![PatEntry { program_number: 1, pmt_pid: 0x30 }],
                })
            }),
            Box::new(|_| {
                Ok(PmtSection {
                    version: 0,
                    program_number: 1,
                    pcr_pid: 0x31,
                    streams: vec![StreamInfo {
                        stream_type: 0x1B,
                        elementary_pid: 0x30,
                        descriptors: vec![],
                    }],
                })
            }),
        );
        tracker.handle_pat(&[0x00]).unwrap();
        tracker.handle_pmt(0x30, &[0x00]).unwrap();
        assert!(!tracker.is_elementary_stream(0x30));
    }
}
