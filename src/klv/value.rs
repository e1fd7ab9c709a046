use std::collections::BTreeMap;

use serde::Serialize;

/// Typed value of a decoded KLV item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KlvValue {
    Unsigned(u64),
    Float(f64),
    Text(String),
    Set(KlvContext),
}

/// Decoded items of one local set, keyed by item name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KlvContext {
    items: BTreeMap<&'static str, KlvValue>,
}

impl KlvContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: KlvValue) {
        self.items.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&KlvValue> {
        self.items.get(name)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            KlvValue::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            KlvValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            KlvValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_set(&self, name: &str) -> Option<&KlvContext> {
        match self.get(name)? {
            KlvValue::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &KlvValue)> {
        self.items.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
