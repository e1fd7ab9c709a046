//! Local set encoding for MISB ST 0601 packets.

use std::collections::BTreeMap;

use super::ber;
use super::packet::compute_checksum;
use super::schema::ElementKind;
use super::st0601::{self, CHECKSUM_TAG, UAS_DATALINK_LS_KEY};

/// Builds a local set; items are written in tag order and the checksum
/// item is always last.
#[derive(Debug, Clone, Default)]
pub struct KlvEncoder {
    tags: BTreeMap<u32, Vec<u8>>,
}

impl KlvEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag with raw bytes value.
    pub fn add_bytes(&mut self, tag: u32, value: Vec<u8>) -> &mut Self {
        self.tags.insert(tag, value);
        self
    }

    pub fn add_u8(&mut self, tag: u32, value: u8) -> &mut Self {
        self.add_bytes(tag, vec![value])
    }

    pub fn add_u16(&mut self, tag: u32, value: u16) -> &mut Self {
        self.add_bytes(tag, value.to_be_bytes().to_vec())
    }

    pub fn add_u64(&mut self, tag: u32, value: u64) -> &mut Self {
        self.add_bytes(tag, value.to_be_bytes().to_vec())
    }

    pub fn add_string(&mut self, tag: u32, value: &str) -> &mut Self {
        self.add_bytes(tag, value.as_bytes().to_vec())
    }

    /// Add an ST 0601 integer-encoded float using the tag's own mapping.
    /// Tags without a mapping are left out.
    pub fn add_float(&mut self, tag: u32, value: f64) -> &mut Self {
        if let Some(ElementKind::Mapped(mapping)) = st0601::element(tag).map(|d| d.kind) {
            self.tags.insert(tag, mapping.encode(value));
        }
        self
    }

    /// Add a nested local set, e.g. the security metadata set.
    pub fn add_set(&mut self, tag: u32, set: &KlvEncoder) -> &mut Self {
        self.add_bytes(tag, set.encode_local_set())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Encode the local set items (no key, no checksum).
    pub fn encode_local_set(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (&tag, value) in self.tags.iter().filter(|(t, _)| **t != CHECKSUM_TAG) {
            ber::write_oid(&mut out, tag);
            ber::write_length(&mut out, value.len());
            out.extend_from_slice(value);
        }
        out
    }

    /// Encode as a complete UAS Datalink packet with a valid checksum.
    ///
    /// Format: [16-byte key] [BER length] [items] [01 02 checksum]
    pub fn encode_st0601(&self) -> Vec<u8> {
        let items = self.encode_local_set();
        let mut packet = UAS_DATALINK_LS_KEY.to_vec();
        ber::write_length(&mut packet, items.len() + 4);
        packet.extend_from_slice(&items);
        packet.extend_from_slice(&[CHECKSUM_TAG as u8, 2]);
        let checksum = compute_checksum(&packet);
        packet.extend_from_slice(&checksum.to_be_bytes());
        packet
    }
}
