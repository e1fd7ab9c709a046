//! Stream builders shared by unit tests.

use crate::constants::{TS_PACKET_SIZE, TS_SYNC_BYTE, stream_id};
use crate::psi::section::CRC_MPEG;

fn finish_section(table_id: u8, table_id_ext: u16, version: u8, body: &[u8]) -> Vec<u8> {
    let section_length = 5 + body.len() + 4;
    let mut section = vec![
        table_id,
        0xB0 | ((section_length >> 8) as u8 & 0x0F),
        section_length as u8,
        (table_id_ext >> 8) as u8,
        table_id_ext as u8,
        0xC1 | ((version & 0x1F) << 1),
        0x00,
        0x00,
    ];
    section.extend_from_slice(body);
    let crc = CRC_MPEG.checksum(&section);
    section.extend_from_slice(&crc.to_be_bytes());
    section
}

/// PAT section (no pointer field) listing `(program_number, pmt_pid)`.
pub fn pat_section(version: u8, programs: &[(u16, u16)]) -> Vec<u8> {
    let mut body = Vec::new();
    for &(program, pid) in programs {
        body.extend_from_slice(&program.to_be_bytes());
        body.push(0xE0 | ((pid >> 8) as u8 & 0x1F));
        body.push(pid as u8);
    }
    finish_section(0x00, 1, version, &body)
}

/// PMT section (no pointer field) listing `(stream_type, pid)`.
pub fn pmt_section(program: u16, pcr_pid: u16, streams: &[(u8, u16)]) -> Vec<u8> {
    let mut body = vec![0xE0 | ((pcr_pid >> 8) as u8 & 0x1F), pcr_pid as u8, 0xF0, 0x00];
    for &(stream_type, pid) in streams {
        body.extend_from_slice(&[
            stream_type,
            0xE0 | ((pid >> 8) as u8 & 0x1F),
            pid as u8,
            0xF0,
            0x00,
        ]);
    }
    finish_section(0x02, program, 0, &body)
}

fn header(pid: u16, start: bool, afc: u8, cc: u8) -> [u8; 4] {
    [
        TS_SYNC_BYTE,
        (if start { 0x40 } else { 0x00 }) | ((pid >> 8) as u8 & 0x1F),
        pid as u8,
        (afc << 4) | (cc & 0x0F),
    ]
}

/// One packet carrying a PSI section behind a zero pointer field.
pub fn psi_packet(pid: u16, section: &[u8]) -> Vec<u8> {
    let mut raw = header(pid, true, 1, 0).to_vec();
    raw.push(0x00);
    raw.extend_from_slice(section);
    raw.resize(TS_PACKET_SIZE, 0xFF);
    raw
}

/// Splits a PES into transport packets, stuffing the last one through the
/// adaptation field so the payload stays exact.
pub fn pes_to_packets(pid: u16, pes: &[u8]) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();
    let mut cc = 0u8;
    for (i, chunk) in pes.chunks(TS_PACKET_SIZE - 4).enumerate() {
        packets.push(payload_packet(pid, i == 0, cc, chunk));
        cc = cc.wrapping_add(1);
    }
    packets
}

/// A packet whose payload is exactly `payload` (at most 184 bytes).
pub fn payload_packet(pid: u16, start: bool, cc: u8, payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() <= TS_PACKET_SIZE - 4);
    let stuffing = TS_PACKET_SIZE - 4 - payload.len();
    let mut raw = Vec::with_capacity(TS_PACKET_SIZE);
    if stuffing == 0 {
        raw.extend_from_slice(&header(pid, start, 1, cc));
    } else {
        raw.extend_from_slice(&header(pid, start, 3, cc));
        raw.push((stuffing - 1) as u8);
        if stuffing > 1 {
            raw.push(0x00);
            raw.resize(4 + stuffing, 0xFF);
        }
    }
    raw.extend_from_slice(payload);
    raw
}

pub fn encode_pts(marker: u8, pts: u64) -> [u8; 5] {
    [
        (marker << 4) | (((pts >> 29) & 0x0E) as u8) | 1,
        (pts >> 22) as u8,
        (((pts >> 14) & 0xFE) as u8) | 1,
        (pts >> 7) as u8,
        (((pts << 1) & 0xFE) as u8) | 1,
    ]
}

/// PES packet with the optional header and an optional PTS.
pub fn pes_packet(id: u8, pts: Option<u64>, data: &[u8]) -> Vec<u8> {
    let header_data: Vec<u8> = pts.map(|p| encode_pts(0b0010, p).to_vec()).unwrap_or_default();
    let packet_length = 3 + header_data.len() + data.len();
    let packet_length = if packet_length > u16::MAX as usize { 0 } else { packet_length };
    let mut pes = vec![0x00, 0x00, 0x01, id];
    pes.extend_from_slice(&(packet_length as u16).to_be_bytes());
    pes.push(0x80);
    pes.push(if pts.is_some() { 0x80 } else { 0x00 });
    pes.push(header_data.len() as u8);
    pes.extend_from_slice(&header_data);
    pes.extend_from_slice(data);
    pes
}

/// Synchronous metadata PES: PTS header plus a metadata access unit cell.
pub fn sync_metadata_pes(pts: u64, klv: &[u8]) -> Vec<u8> {
    let mut au = vec![0x00, 0x00, 0x00];
    au.extend_from_slice(&(klv.len() as u16).to_be_bytes());
    au.extend_from_slice(klv);
    pes_packet(stream_id::METADATA, Some(pts), &au)
}

/// Annex-B NAL unit with a 4-byte start code.
pub fn nal(nal_ref_idc: u8, nal_type: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![0x00, 0x00, 0x00, 0x01, (nal_ref_idc << 5) | nal_type];
    out.extend_from_slice(body);
    out
}
