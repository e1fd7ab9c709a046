//! Periodic handover of buffered files to the storage action.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::buffer::{RolloverCondition, RotateResult, SharedPacketBuffer};
use crate::error::Result;
use crate::filename::FilenameGenerator;

/// Consumer of completed rollover files. The file is deleted after
/// `on_rollover` returns, whatever the outcome.
pub trait RolloverAction: Send {
    fn on_rollover(&mut self, file: &Path) -> Result<()>;

    /// Called once when the stream goes idle.
    fn on_stream_ended(&mut self) {}
}

impl<F> RolloverAction for F
where
    F: FnMut(&Path) -> Result<()> + Send,
{
    fn on_rollover(&mut self, file: &Path) -> Result<()> {
        self(file)
    }
}

pub struct StreamRotator {
    buffer: SharedPacketBuffer,
    condition: RolloverCondition,
    action: Box<dyn RolloverAction>,
}

impl StreamRotator {
    pub fn new(
        buffer: SharedPacketBuffer,
        condition: RolloverCondition,
        action: impl RolloverAction + 'static,
    ) -> Self {
        Self { buffer, condition, action: Box::new(action) }
    }

    pub fn condition(&self) -> &RolloverCondition {
        &self.condition
    }

    pub fn condition_mut(&mut self) -> &mut RolloverCondition {
        &mut self.condition
    }

    /// One timer tick: rotate the buffer and deliver a completed file.
    pub fn check_for_rollover(&mut self) -> io::Result<RotateResult> {
        let result = self.buffer.lock().rotate(&self.condition)?;
        if let Some(file) = &result.file {
            self.do_rollover(file);
        }
        if result.timed_out {
            info!("Stream ended");
            self.action.on_stream_ended();
        }
        Ok(result)
    }

    /// Flushes whatever is buffered, delivers it and clears the buffer.
    pub fn shutdown(&mut self) {
        let flushed = self.buffer.lock().flush_and_rotate();
        match flushed {
            Ok(Some(file)) => self.do_rollover(&file),
            Ok(None) => {}
            Err(e) => error!("Unable to flush packet buffer on shutdown: {e}"),
        }
        self.buffer.lock().reset();
    }

    fn do_rollover(&mut self, file: &Path) {
        if let Err(e) = self.action.on_rollover(file) {
            error!("Rollover action failed for {}: {e}", file.display());
        }
        if let Err(e) = fs::remove_file(file) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Unable to delete temp file {}: {e}", file.display());
            }
        }
    }
}

/// Copies each rollover file into a directory under a generated name.
pub struct DirectoryRolloverAction {
    dir: PathBuf,
    filenames: Box<dyn FilenameGenerator>,
    delivered: u64,
    last_delivered: Option<PathBuf>,
}

impl DirectoryRolloverAction {
    pub fn new(dir: impl Into<PathBuf>, filenames: impl FilenameGenerator + 'static) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, filenames: Box::new(filenames), delivered: 0, last_delivered: None })
    }

    /// Number of files stored so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn last_delivered(&self) -> Option<&Path> {
        self.last_delivered.as_deref()
    }

    fn target(&self, file: &Path) -> PathBuf {
        let stem = file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let name = self.filenames.generate(&stem);
        let candidate = self.dir.join(&name);
        if !candidate.exists() {
            return candidate;
        }
        let (base, ext) = match name.rsplit_once('.') {
            Some((base, ext)) => (base.to_string(), format!(".{ext}")),
            None => (name.clone(), String::new()),
        };
        (1..)
            .map(|n| self.dir.join(format!("{base}-{n}{ext}")))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl RolloverAction for DirectoryRolloverAction {
    fn on_rollover(&mut self, file: &Path) -> Result<()> {
        let target = self.target(file);
        fs::copy(file, &target)?;
        info!("Stored {} as {}", file.display(), target.display());
        self.delivered += 1;
        self.last_delivered = Some(target);
        Ok(())
    }

    fn on_stream_ended(&mut self) {
        info!("Stream ended after {} stored file(s) in {}", self.delivered, self.dir.display());
    }
}
