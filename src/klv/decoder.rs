//! Decoding of 16-byte-key universal sets.

use tracing::debug;

use super::ber;
use super::schema::{ElementDef, decode_local_set};
use super::st0601::{UAS_DATALINK_LOCAL_SET, UAS_DATALINK_LS_KEY, UAS_ELEMENTS};
use super::value::{KlvContext, KlvValue};
use crate::error::KlvError;

const UNIVERSAL_KEY_SIZE: usize = 16;

/// A top-level key/length/value triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniversalEntry<'a> {
    pub key: &'a [u8],
    pub value: &'a [u8],
    /// Key, length and value as they appear on the wire.
    pub encoded: &'a [u8],
}

/// Splits `bytes` into top-level universal entries. Trailing bytes too short
/// to hold a key are ignored.
pub fn split_universal(bytes: &[u8]) -> Result<Vec<UniversalEntry<'_>>, KlvError> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while bytes.len() - pos > UNIVERSAL_KEY_SIZE {
        let start = pos;
        let key = &bytes[pos..pos + UNIVERSAL_KEY_SIZE];
        pos += UNIVERSAL_KEY_SIZE;
        let (len, n) = ber::read_length(&bytes[pos..]).ok_or(KlvError::InvalidBer(pos))?;
        pos += n;
        if len > bytes.len() - pos {
            return Err(KlvError::Truncated { need: len, have: bytes.len() - pos });
        }
        entries.push(UniversalEntry {
            key,
            value: &bytes[pos..pos + len],
            encoded: &bytes[start..pos + len],
        });
        pos += len;
    }
    Ok(entries)
}

/// A universal set the decoder knows how to expand.
#[derive(Debug)]
pub struct UniversalSetDef {
    pub key: [u8; 16],
    pub name: &'static str,
    pub elements: &'static [ElementDef],
}

pub static UAS_DATALINK_SET: UniversalSetDef = UniversalSetDef {
    key: UAS_DATALINK_LS_KEY,
    name: UAS_DATALINK_LOCAL_SET,
    elements: &UAS_ELEMENTS,
};

/// Decodes KLV payloads against a fixed list of universal sets.
#[derive(Debug, Clone)]
pub struct KlvDecoder {
    sets: Vec<&'static UniversalSetDef>,
}

impl KlvDecoder {
    pub fn new(sets: Vec<&'static UniversalSetDef>) -> Self {
        Self { sets }
    }

    /// Decoder for the UAS Datalink Local Set.
    pub fn st0601() -> Self {
        Self::new(vec![&UAS_DATALINK_SET])
    }

    /// Context holding one entry per recognised universal set.
    pub fn decode(&self, bytes: &[u8]) -> Result<KlvContext, KlvError> {
        let mut context = KlvContext::new();
        for entry in split_universal(bytes)? {
            match self.sets.iter().find(|s| s.key[..] == *entry.key) {
                Some(set) => {
                    let decoded = decode_local_set(set.elements, entry.value)?;
                    context.insert(set.name, KlvValue::Set(decoded));
                }
                None => debug!("skipping universal set with key {:02x?}", entry.key),
            }
        }
        Ok(context)
    }
}

impl Default for KlvDecoder {
    fn default() -> Self {
        Self::st0601()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_is_skipped() {
        let mut bytes = vec![0xAA; 16];
        bytes.extend([0x02, 0x01, 0x02]);
        let context = KlvDecoder::st0601().decode(&bytes).unwrap();
        assert!(context.is_empty());
    }

    #[test]
    fn test_split_reports_truncation() {
        let mut bytes = UAS_DATALINK_LS_KEY.to_vec();
        bytes.extend([0x10, 0x01]);
        assert_eq!(
            split_universal(&bytes).unwrap_err(),
            KlvError::Truncated { need: 16, have: 1 }
        );
    }

    #[test]
    fn test_decode_uas_items() {
        let mut bytes = UAS_DATALINK_LS_KEY.to_vec();
        bytes.extend([0x07, 0x03, 0x02, b'M', b'1', 0x4D, 0x01, 0x02]);
        let context = KlvDecoder::st0601().decode(&bytes).unwrap();
        let uas = context.get_set(UAS_DATALINK_LOCAL_SET).unwrap();
        assert_eq!(uas.get_text("mission id"), Some("M1"));
        assert_eq!(uas.get_u64("operational mode"), Some(2));
    }
}
