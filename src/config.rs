//! TOML configuration for an ingest session.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::{BufferConfig, RolloverCondition};
use crate::constants::{
    DEFAULT_ACTIVITY_TIMEOUT, DEFAULT_ELAPSED_TIME, DEFAULT_MAX_FRAMESET_SIZE, DEFAULT_MAX_INCOMPLETE_FRAME_BYTES,
    DEFAULT_MEGABYTE_COUNT, DEFAULT_ROLLOVER_CHECK_INTERVAL,
};
use crate::error::{Error, Result};
use crate::filename::DateTemplateFilenameGenerator;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub buffer: BufferSection,

    #[serde(default)]
    pub rollover: RolloverSection,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// UDP socket to bind + listen (IPv4, unicast or multicast)
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Interface used to join a multicast group
    #[serde(default)]
    pub interface: Option<Ipv4Addr>,
}

fn default_addr() -> String {
    "239.1.1.2:1234".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { addr: default_addr(), interface: None }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BufferSection {
    #[serde(default = "default_max_incomplete_frame_bytes")]
    pub max_incomplete_frame_bytes: u64,

    #[serde(default = "default_activity_timeout_ms")]
    pub activity_timeout_ms: u64,

    #[serde(default = "default_max_frameset_size")]
    pub max_frameset_size: usize,

    /// Directory for temp files (system temp dir when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_max_incomplete_frame_bytes() -> u64 {
    DEFAULT_MAX_INCOMPLETE_FRAME_BYTES
}

fn default_activity_timeout_ms() -> u64 {
    DEFAULT_ACTIVITY_TIMEOUT.as_millis() as u64
}

fn default_max_frameset_size() -> usize {
    DEFAULT_MAX_FRAMESET_SIZE
}

impl Default for BufferSection {
    fn default() -> Self {
        Self {
            max_incomplete_frame_bytes: default_max_incomplete_frame_bytes(),
            activity_timeout_ms: default_activity_timeout_ms(),
            max_frameset_size: default_max_frameset_size(),
            temp_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RolloverSection {
    /// Hand a file over once it holds this many megabytes (10^6 bytes)
    #[serde(default = "default_megabyte_count")]
    pub megabyte_count: u64,

    /// ... or once it is this old
    #[serde(default = "default_elapsed_time_ms")]
    pub elapsed_time_ms: u64,

    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
}

fn default_megabyte_count() -> u64 {
    DEFAULT_MEGABYTE_COUNT
}

fn default_elapsed_time_ms() -> u64 {
    DEFAULT_ELAPSED_TIME.as_millis() as u64
}

fn default_check_interval_ms() -> u64 {
    DEFAULT_ROLLOVER_CHECK_INTERVAL.as_millis() as u64
}

impl Default for RolloverSection {
    fn default() -> Self {
        Self {
            megabyte_count: default_megabyte_count(),
            elapsed_time_ms: default_elapsed_time_ms(),
            check_interval_ms: default_check_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Where rollover files are stored
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Stored file name; `%{date=FMT}` expands with strftime
    #[serde(default = "default_filename_template")]
    pub filename_template: String,
}

fn default_directory() -> PathBuf {
    PathBuf::from("./ingest")
}

fn default_filename_template() -> String {
    "mpegts-stream-%{date=%Y%m%d_%H%M%S}".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { directory: default_directory(), filename_template: default_filename_template() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DecoderConfig {
    #[serde(default = "default_true")]
    pub klv_enabled: bool,

    /// Stop the session when a PAT lists no programs
    #[serde(default)]
    pub abort_on_empty_pat: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { klv_enabled: true, abort_on_empty_pat: false }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Refresh interval for the JSON stats snapshot; 0 disables it
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// Print every decoded KLV record as JSON
    #[serde(default)]
    pub print_metadata: bool,
}

fn default_refresh_secs() -> u64 {
    2
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { refresh_secs: default_refresh_secs(), print_metadata: false }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rollover_condition()?;
        if self.rollover.check_interval_ms == 0 {
            return Err(Error::Config("rollover.check_interval_ms must be positive".into()));
        }
        if self.buffer.activity_timeout_ms == 0 {
            return Err(Error::Config("buffer.activity_timeout_ms must be positive".into()));
        }
        if self.buffer.max_frameset_size == 0 {
            return Err(Error::Config("buffer.max_frameset_size must be positive".into()));
        }
        DateTemplateFilenameGenerator::new(self.output.filename_template.as_str())?;
        Ok(())
    }

    pub fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            max_incomplete_frame_bytes: self.buffer.max_incomplete_frame_bytes,
            max_frameset_size: self.buffer.max_frameset_size,
            activity_timeout: Duration::from_millis(self.buffer.activity_timeout_ms),
        }
    }

    /// Size or age, whichever comes first.
    pub fn rollover_condition(&self) -> Result<RolloverCondition> {
        Ok(RolloverCondition::any([
            RolloverCondition::megabytes(self.rollover.megabyte_count)?,
            RolloverCondition::elapsed(Duration::from_millis(self.rollover.elapsed_time_ms))?,
        ]))
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.rollover.check_interval_ms)
    }
}
