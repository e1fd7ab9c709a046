//! Local set element definitions and typed decoding.

use tracing::debug;

use super::ber;
use super::value::{KlvContext, KlvValue};
use crate::error::KlvError;

/// Integer carrier of an integer-encoded floating point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInt {
    U16,
    U32,
    I16,
    I32,
}

impl RawInt {
    pub fn size(self) -> usize {
        match self {
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 => 4,
        }
    }

    /// Usable raw range; the most negative signed value is reserved.
    fn range(self) -> (f64, f64) {
        match self {
            Self::U16 => (0.0, u16::MAX as f64),
            Self::U32 => (0.0, u32::MAX as f64),
            Self::I16 => (-(i16::MAX as f64), i16::MAX as f64),
            Self::I32 => (-(i32::MAX as f64), i32::MAX as f64),
        }
    }

    fn read(self, bytes: &[u8]) -> Option<f64> {
        match self {
            Self::U16 => Some(u16::from_be_bytes(bytes.try_into().ok()?) as f64),
            Self::U32 => Some(u32::from_be_bytes(bytes.try_into().ok()?) as f64),
            Self::I16 => match i16::from_be_bytes(bytes.try_into().ok()?) {
                i16::MIN => None,
                v => Some(v as f64),
            },
            Self::I32 => match i32::from_be_bytes(bytes.try_into().ok()?) {
                i32::MIN => None,
                v => Some(v as f64),
            },
        }
    }

    fn write(self, raw: f64) -> Vec<u8> {
        match self {
            Self::U16 => (raw as u16).to_be_bytes().to_vec(),
            Self::U32 => (raw as u32).to_be_bytes().to_vec(),
            Self::I16 => (raw as i16).to_be_bytes().to_vec(),
            Self::I32 => (raw as i32).to_be_bytes().to_vec(),
        }
    }
}

/// Linear map between an integer range and a floating point range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatMapping {
    pub raw: RawInt,
    pub min: f64,
    pub max: f64,
}

impl FloatMapping {
    pub const fn new(raw: RawInt, min: f64, max: f64) -> Self {
        Self { raw, min, max }
    }

    /// None for a wrong size or the reserved error indicator.
    pub fn decode(&self, bytes: &[u8]) -> Option<f64> {
        let raw = self.raw.read(bytes)?;
        let (raw_min, raw_max) = self.raw.range();
        Some((raw - raw_min) / (raw_max - raw_min) * (self.max - self.min) + self.min)
    }

    /// Nearest raw encoding of `value`, clamped to the mapped range.
    pub fn encode(&self, value: f64) -> Vec<u8> {
        let (raw_min, raw_max) = self.raw.range();
        let value = value.clamp(self.min, self.max);
        let raw = ((value - self.min) / (self.max - self.min) * (raw_max - raw_min) + raw_min).round();
        self.raw.write(raw.clamp(raw_min, raw_max))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ElementKind {
    /// Big-endian unsigned integer of at most this many bytes.
    Unsigned(usize),
    Text,
    Mapped(FloatMapping),
    LocalSet(&'static [ElementDef]),
}

#[derive(Debug, Clone, Copy)]
pub struct ElementDef {
    pub tag: u32,
    pub name: &'static str,
    pub kind: ElementKind,
}

impl ElementDef {
    pub const fn new(tag: u32, name: &'static str, kind: ElementKind) -> Self {
        Self { tag, name, kind }
    }

    /// Typed value, or None when the item does not fit its definition.
    pub fn decode(&self, value: &[u8]) -> Result<Option<KlvValue>, KlvError> {
        Ok(match self.kind {
            ElementKind::Unsigned(size) => {
                if value.is_empty() || value.len() > size {
                    None
                } else {
                    Some(KlvValue::Unsigned(
                        value.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
                    ))
                }
            }
            ElementKind::Text => {
                let text = String::from_utf8_lossy(value);
                Some(KlvValue::Text(text.trim_end_matches('\0').to_string()))
            }
            ElementKind::Mapped(mapping) => mapping.decode(value).map(KlvValue::Float),
            ElementKind::LocalSet(defs) => Some(KlvValue::Set(decode_local_set(defs, value)?)),
        })
    }
}

/// Decodes BER-OID tagged, BER length items against `defs`. Unknown tags and
/// items that do not fit their definition are skipped.
pub fn decode_local_set(defs: &'static [ElementDef], bytes: &[u8]) -> Result<KlvContext, KlvError> {
    let mut context = KlvContext::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (tag, n) = ber::read_oid(&bytes[pos..]).ok_or(KlvError::InvalidBer(pos))?;
        pos += n;
        let (len, n) = ber::read_length(&bytes[pos..]).ok_or(KlvError::InvalidBer(pos))?;
        pos += n;
        let end = pos.saturating_add(len);
        if end > bytes.len() {
            return Err(KlvError::Truncated { need: len, have: bytes.len() - pos });
        }
        let value = &bytes[pos..end];
        pos = end;

        let Some(def) = defs.iter().find(|d| d.tag == tag) else {
            debug!("skipping unknown local set tag {tag}");
            continue;
        };
        match def.decode(value)? {
            Some(decoded) => context.insert(def.name, decoded),
            None => debug!("skipping '{}': {} byte value does not fit", def.name, value.len()),
        }
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_endpoints() {
        let lat = FloatMapping::new(RawInt::I32, -90.0, 90.0);
        assert_eq!(lat.decode(&i32::MAX.to_be_bytes()), Some(90.0));
        assert_eq!(lat.decode(&(-i32::MAX).to_be_bytes()), Some(-90.0));
        assert_eq!(lat.decode(&i32::MIN.to_be_bytes()), None);
        assert_eq!(lat.decode(&[0, 0]), None);

        let alt = FloatMapping::new(RawInt::U16, -900.0, 19000.0);
        assert_eq!(alt.decode(&[0, 0]), Some(-900.0));
        assert_eq!(alt.decode(&[0xFF, 0xFF]), Some(19000.0));
    }

    #[test]
    fn test_mapping_encode_is_nearest() {
        let lon = FloatMapping::new(RawInt::I32, -180.0, 180.0);
        let decoded = lon.decode(&lon.encode(-77.0364)).unwrap();
        assert!((decoded - -77.0364).abs() < 1e-6);

        let offset = FloatMapping::new(RawInt::I16, -0.075, 0.075);
        let decoded = offset.decode(&offset.encode(0.01)).unwrap();
        assert!((decoded - 0.01).abs() < 5e-6);
    }

    static INNER: [ElementDef; 1] = [ElementDef::new(1, "level", ElementKind::Unsigned(1))];
    static OUTER: [ElementDef; 3] = [
        ElementDef::new(2, "count", ElementKind::Unsigned(2)),
        ElementDef::new(3, "label", ElementKind::Text),
        ElementDef::new(4, "nested", ElementKind::LocalSet(&INNER)),
    ];

    #[test]
    fn test_decode_local_set() {
        let bytes = [
            0x02, 0x02, 0x01, 0x00, // count = 256
            0x09, 0x01, 0xFF, // unknown tag
            0x03, 0x03, b'a', b'b', 0x00, // label
            0x04, 0x03, 0x01, 0x01, 0x05, // nested level = 5
            0x02, 0x03, 0x00, 0x00, 0x01, // too wide, dropped
        ];
        let context = decode_local_set(&OUTER, &bytes).unwrap();
        assert_eq!(context.get("count"), Some(&KlvValue::Unsigned(256)));
        assert_eq!(context.get("label"), Some(&KlvValue::Text("ab".into())));
        assert_eq!(
            context.get_set("nested").and_then(|s| s.get_u64("level")),
            Some(5)
        );
        assert_eq!(context.len(), 3);
    }

    #[test]
    fn test_truncated_item_fails() {
        let err = decode_local_set(&OUTER, &[0x02, 0x05, 0x01]).unwrap_err();
        assert_eq!(err, KlvError::Truncated { need: 5, have: 1 });
    }
}
