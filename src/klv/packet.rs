//! Metadata PES unwrapping and checksum validation.

use serde::Serialize;
use tracing::debug;

use super::decoder::split_universal;
use super::st0601::{CHECKSUM, UAS_DATALINK_LOCAL_SET, UAS_DATALINK_LS_KEY};
use super::value::KlvContext;
use crate::constants::{METADATA_AU_HEADER_SIZE, PTS_UNKNOWN, SYNC_METADATA_PES_HEADER_SIZE, stream_id};
use crate::error::{KlvError, Result};
use crate::pes::PesHeader;

/// How the metadata was carried in its PES packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetadataForm {
    /// stream_id 0xFC with a metadata access unit cell
    Synchronous,
    /// stream_id 0xBD, KLV directly after the PES header
    Asynchronous,
}

/// KLV bytes located inside a metadata PES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataPayload<'a> {
    pub form: MetadataForm,
    /// 33-bit PTS, or -1 when the PES header carries none.
    pub pts: i64,
    pub klv: &'a [u8],
}

/// A checksum-validated KLV record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedKlvPacket {
    pub pts: i64,
    pub context: KlvContext,
}

impl DecodedKlvPacket {
    pub fn uas_set(&self) -> Option<&KlvContext> {
        self.context.get_set(UAS_DATALINK_LOCAL_SET)
    }
}

/// Finds the KLV bytes of a metadata PES. Ok(None) when the packet carries no
/// KLV or uses a stream id other than 0xFC / 0xBD.
pub fn extract_metadata(pes: &[u8]) -> Result<Option<MetadataPayload<'_>>> {
    let header = PesHeader::parse(pes)?;
    let pts = header.pts.map(|p| p as i64).unwrap_or(PTS_UNKNOWN);

    match header.stream_id {
        stream_id::METADATA => {
            if pes.len() < SYNC_METADATA_PES_HEADER_SIZE {
                return Ok(None);
            }
            // PES_packet_length counts 8 header bytes after the length field
            let available = pes.len() - SYNC_METADATA_PES_HEADER_SIZE;
            let au_len = match header.packet_length {
                0 => available,
                len => (len as usize).saturating_sub(8).min(available),
            };
            let au = &pes[SYNC_METADATA_PES_HEADER_SIZE..SYNC_METADATA_PES_HEADER_SIZE + au_len];
            if au.len() < METADATA_AU_HEADER_SIZE {
                return Ok(None);
            }
            let cell_len = u16::from_be_bytes([au[3], au[4]]) as usize;
            let body = &au[METADATA_AU_HEADER_SIZE..];
            let klv = &body[..cell_len.min(body.len())];
            Ok((!klv.is_empty()).then_some(MetadataPayload { form: MetadataForm::Synchronous, pts, klv }))
        }
        stream_id::PRIVATE_STREAM_1 => {
            let klv = header.payload(pes);
            Ok((!klv.is_empty()).then_some(MetadataPayload { form: MetadataForm::Asynchronous, pts, klv }))
        }
        other => {
            debug!("Unknown stream type {other:#04x}. Skipping this packet.");
            Ok(None)
        }
    }
}

/// Running 16-bit sum with even-indexed bytes in the high octet.
pub fn compute_checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .enumerate()
        .fold(0u16, |sum, (i, &b)| sum.wrapping_add((b as u16) << (8 * ((i + 1) % 2))))
}

/// Checks the decoded checksum item against the encoded UAS Datalink set.
pub fn validate_checksum(klv: &[u8], context: &KlvContext) -> std::result::Result<(), KlvError> {
    let uas = context.get_set(UAS_DATALINK_LOCAL_SET).ok_or(KlvError::MissingLocalSet)?;
    let expected = uas.get_u64(CHECKSUM).ok_or(KlvError::MissingChecksum)? as u16;

    let encoded = split_universal(klv)?
        .into_iter()
        .find(|e| e.key == UAS_DATALINK_LS_KEY)
        .map(|e| e.encoded)
        .ok_or(KlvError::MissingLocalSet)?;
    let calculated = compute_checksum(&encoded[..encoded.len().saturating_sub(2)]);

    if calculated != expected {
        return Err(KlvError::ChecksumMismatch { expected, calculated });
    }
    Ok(())
}

/// Unwraps, decodes and validates one metadata PES.
pub fn decode_metadata_pes<F>(pes: &[u8], decode: F) -> Result<Option<DecodedKlvPacket>>
where
    F: Fn(&[u8]) -> Result<KlvContext>,
{
    let Some(payload) = extract_metadata(pes)? else {
        return Ok(None);
    };
    let context = decode(payload.klv)?;
    validate_checksum(payload.klv, &context)?;
    Ok(Some(DecodedKlvPacket { pts: payload.pts, context }))
}
