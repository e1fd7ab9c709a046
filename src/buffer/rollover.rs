//! Conditions deciding when the current temp file is handed over.

use std::time::Duration;

use super::BufferState;
use crate::constants::BYTES_PER_MEGABYTE;
use crate::error::{Error, Result};

const MIN_ELAPSED_TIME: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloverCondition {
    /// Ready once the file holds at least `bytes`.
    ByteCount { bytes: u64 },
    /// Ready once the file is at least this old.
    ElapsedTime(Duration),
    /// Ready when any inner condition is.
    Any(Vec<RolloverCondition>),
}

impl RolloverCondition {
    pub fn megabytes(count: u64) -> Result<Self> {
        Ok(Self::ByteCount { bytes: megabytes_to_bytes(count)? })
    }

    pub fn elapsed(threshold: Duration) -> Result<Self> {
        check_elapsed(threshold)?;
        Ok(Self::ElapsedTime(threshold))
    }

    pub fn any(conditions: impl IntoIterator<Item = RolloverCondition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    pub fn is_rollover_ready(&self, state: &BufferState) -> bool {
        match self {
            Self::ByteCount { bytes } => state.byte_count >= *bytes,
            Self::ElapsedTime(threshold) => state.age >= *threshold,
            Self::Any(conditions) => conditions.iter().any(|c| c.is_rollover_ready(state)),
        }
    }

    /// Updates every byte-count condition, nested ones included.
    pub fn set_megabyte_count(&mut self, count: u64) -> Result<()> {
        let bytes = megabytes_to_bytes(count)?;
        self.visit_mut(&mut |c: &mut RolloverCondition| {
            if let Self::ByteCount { bytes: b } = c {
                *b = bytes;
            }
        });
        Ok(())
    }

    /// Updates every elapsed-time condition, nested ones included.
    pub fn set_elapsed_time(&mut self, threshold: Duration) -> Result<()> {
        check_elapsed(threshold)?;
        self.visit_mut(&mut |c: &mut RolloverCondition| {
            if let Self::ElapsedTime(t) = c {
                *t = threshold;
            }
        });
        Ok(())
    }

    fn visit_mut(&mut self, f: &mut dyn FnMut(&mut Self)) {
        match self {
            Self::Any(conditions) => conditions.iter_mut().for_each(|c| c.visit_mut(f)),
            leaf => f(leaf),
        }
    }
}

fn megabytes_to_bytes(count: u64) -> Result<u64> {
    if count == 0 || count > u64::MAX / BYTES_PER_MEGABYTE {
        return Err(Error::threshold(format!(
            "megabyte count must be between 1 and {}, got {count}",
            u64::MAX / BYTES_PER_MEGABYTE
        )));
    }
    Ok(count * BYTES_PER_MEGABYTE)
}

fn check_elapsed(threshold: Duration) -> Result<()> {
    if threshold < MIN_ELAPSED_TIME {
        return Err(Error::threshold(format!(
            "elapsed time must be at least 1 ms, got {threshold:?}"
        )));
    }
    Ok(())
}
