//! Error types for the ingest pipeline.

use std::io;
use thiserror::Error;

/// Result type for ingest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ingest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A 188-byte region that is not a valid transport packet.
    #[error("Malformed transport packet: {0}")]
    MalformedPacket(String),

    /// PSI section framing, length or CRC problem.
    #[error("Invalid PSI section: {0}")]
    Section(String),

    /// The PAT parsed but listed no programs.
    #[error("No programs found in transport stream.")]
    NoPrograms,

    /// NAL unit header could not be parsed.
    #[error("Invalid NAL unit: {0}")]
    Nal(String),

    /// PES header could not be parsed.
    #[error("Invalid PES header: {0}")]
    Pes(String),

    /// KLV metadata failed to decode.
    #[error("KLV decoding failed: {0}")]
    Klv(#[from] KlvError),

    /// Rollover threshold outside its valid range.
    #[error("Invalid rollover threshold: {0}")]
    InvalidThreshold(String),

    /// Configuration file could not be used.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a malformed packet error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPacket(msg.into())
    }

    /// Create an invalid section error.
    pub fn section(msg: impl Into<String>) -> Self {
        Self::Section(msg.into())
    }

    /// Create an invalid NAL unit error.
    pub fn nal(msg: impl Into<String>) -> Self {
        Self::Nal(msg.into())
    }

    /// Create an invalid PES header error.
    pub fn pes(msg: impl Into<String>) -> Self {
        Self::Pes(msg.into())
    }

    /// Create an invalid threshold error.
    pub fn threshold(msg: impl Into<String>) -> Self {
        Self::InvalidThreshold(msg.into())
    }

    /// True for failures that belong to the I/O category, including a stream
    /// whose program association is empty.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::NoPrograms)
    }
}

/// Failures raised while decoding a KLV payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KlvError {
    #[error("KLV did not contain the UAS Datalink Local Set")]
    MissingLocalSet,

    #[error("the UAS Datalink Local Set did not contain a checksum")]
    MissingChecksum,

    #[error("checksum does not match (expected {expected:#06x}, calculated {calculated:#06x})")]
    ChecksumMismatch { expected: u16, calculated: u16 },

    #[error("truncated KLV: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("invalid BER encoding at offset {0}")]
    InvalidBer(usize),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
