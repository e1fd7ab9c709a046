//! Frame-aligned buffering of raw transport bytes into rollover files.
//!
//! Every transport packet is written here before it is demultiplexed. The
//! decoder reports frame boundaries through [`PacketBuffer::frame_complete`];
//! bytes only reach the temp file once a whole frameset (the frames before
//! the most recent IDR frame) is available, so a file handed to the rollover
//! action never ends in the middle of a group of pictures.

pub mod output;
pub mod rollover;

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::{
    ACTIVITY_LOG_PERIOD, DEFAULT_ACTIVITY_TIMEOUT, DEFAULT_MAX_FRAMESET_SIZE, DEFAULT_MAX_INCOMPLETE_FRAME_BYTES,
};
use crate::types::FrameKind;

pub use output::{AppendFileFactory, OutputStreamFactory, SystemTempFiles, TempFileGenerator};
pub use rollover::RolloverCondition;

/// Buffer shared between the decode path and the rollover timer.
pub type SharedPacketBuffer = Arc<Mutex<PacketBuffer>>;

/// Source of the current instant.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Arc::new(Mutex::new(Instant::now())) }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Incomplete-frame bytes beyond this are pushed out as an unknown frame.
    pub max_incomplete_frame_bytes: u64,
    /// More frames than this are flushed without waiting for an IDR frame.
    pub max_frameset_size: usize,
    /// Idle time after which the stream is considered ended.
    pub activity_timeout: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_incomplete_frame_bytes: DEFAULT_MAX_INCOMPLETE_FRAME_BYTES,
            max_frameset_size: DEFAULT_MAX_FRAMESET_SIZE,
            activity_timeout: DEFAULT_ACTIVITY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub bytes: Vec<u8>,
}

/// Snapshot a rollover condition is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferState {
    pub byte_count: u64,
    pub age: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotateResult {
    /// Completed temp file, now owned by the caller.
    pub file: Option<PathBuf>,
    /// True when the rotation was forced by stream inactivity.
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    pub bytes_received: u64,
    pub packets_received: u64,
    pub bytes_written: u64,
    pub files_written: u64,
}

struct OutputFile {
    path: PathBuf,
    created: Instant,
    bytes_written: u64,
    writer: Box<dyn Write + Send>,
}

pub struct PacketBuffer {
    config: BufferConfig,
    frames: VecDeque<Frame>,
    incomplete: Vec<u8>,
    current: Option<OutputFile>,
    temp_files: Box<dyn TempFileGenerator>,
    streams: Box<dyn OutputStreamFactory>,
    clock: Box<dyn Clock>,
    last_activity: Instant,
    last_activity_log: Instant,
    frame_marked: bool,
    stats: BufferStats,
}

impl PacketBuffer {
    /// System temp files opened for append, system clock.
    pub fn new(config: BufferConfig) -> Self {
        let now = Instant::now();
        Self {
            config,
            frames: VecDeque::new(),
            incomplete: Vec::new(),
            current: None,
            temp_files: Box::new(SystemTempFiles::new()),
            streams: Box::new(AppendFileFactory),
            clock: Box::new(SystemClock),
            last_activity: now,
            last_activity_log: now,
            frame_marked: false,
            stats: BufferStats::default(),
        }
    }

    pub fn with_temp_files(mut self, temp_files: impl TempFileGenerator + 'static) -> Self {
        self.temp_files = Box::new(temp_files);
        self
    }

    pub fn with_output(mut self, streams: impl OutputStreamFactory + 'static) -> Self {
        self.streams = Box::new(streams);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        let now = clock.now();
        self.clock = Box::new(clock);
        self.last_activity = now;
        self.last_activity_log = now;
        self
    }

    pub fn into_shared(self) -> SharedPacketBuffer {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Appends raw transport bytes to the frame in progress.
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let now = self.clock.now();
        self.incomplete.extend_from_slice(bytes);
        self.last_activity = now;
        self.stats.bytes_received += bytes.len() as u64;
        self.stats.packets_received += 1;
        self.log_activity(now);

        if self.incomplete.len() as u64 > self.config.max_incomplete_frame_bytes {
            debug!(
                "Incomplete frame exceeded {} bytes, pushing it out",
                self.config.max_incomplete_frame_bytes
            );
            self.push_incomplete(FrameKind::Unknown);
            self.flush_available()?;
        }
        Ok(())
    }

    /// Closes the frame in progress with the given kind.
    pub fn frame_complete(&mut self, kind: FrameKind) -> io::Result<()> {
        self.frame_marked = true;
        self.push_incomplete(kind);
        self.flush_available()
    }

    /// Hands over the current file when `condition` is ready. An idle stream
    /// that has reported frames is flushed completely and handed over
    /// regardless of the condition.
    pub fn rotate(&mut self, condition: &RolloverCondition) -> io::Result<RotateResult> {
        let now = self.clock.now();
        if self.frame_marked && now.saturating_duration_since(self.last_activity) > self.config.activity_timeout {
            info!("No stream activity for {:?}, flushing buffered frames", self.config.activity_timeout);
            if !self.incomplete.is_empty() {
                self.push_incomplete(FrameKind::Unknown);
            }
            self.flush_all()?;
            self.frame_marked = false;
            self.last_activity = now;
            return Ok(RotateResult { file: self.take_file()?, timed_out: true });
        }

        self.flush_available()?;
        if !condition.is_rollover_ready(&self.state()) {
            return Ok(RotateResult::default());
        }
        Ok(RotateResult { file: self.take_file()?, timed_out: false })
    }

    /// Writes everything buffered, aligned or not, and hands over the file
    /// if any bytes were written.
    pub fn flush_and_rotate(&mut self) -> io::Result<Option<PathBuf>> {
        if !self.incomplete.is_empty() {
            self.push_incomplete(FrameKind::Unknown);
        }
        self.flush_all()?;
        self.take_file()
    }

    /// Drops all buffered bytes and deletes a partially written temp file.
    /// Counters are kept.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.incomplete.clear();
        self.frame_marked = false;
        self.last_activity = self.clock.now();
        if let Some(file) = self.current.take() {
            let OutputFile { path, writer, .. } = file;
            drop(writer);
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Unable to delete temp file {}: {e}", path.display());
                }
            }
        }
    }

    /// Age of the current temp file; zero when none exists.
    pub fn age(&self) -> Duration {
        self.current
            .as_ref()
            .map(|f| self.clock.now().saturating_duration_since(f.created))
            .unwrap_or_default()
    }

    /// Bytes written to the current temp file.
    pub fn byte_count(&self) -> u64 {
        self.current.as_ref().map(|f| f.bytes_written).unwrap_or(0)
    }

    pub fn state(&self) -> BufferState {
        BufferState { byte_count: self.byte_count(), age: self.age() }
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    pub fn buffered_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn incomplete_len(&self) -> usize {
        self.incomplete.len()
    }

    fn push_incomplete(&mut self, kind: FrameKind) {
        let bytes = std::mem::take(&mut self.incomplete);
        self.frames.push_back(Frame { kind, bytes });
    }

    fn flush_available(&mut self) -> io::Result<()> {
        match self.last_frameset_index() {
            Some(index) => self.write_frames(index + 1),
            None => Ok(()),
        }
    }

    fn flush_all(&mut self) -> io::Result<()> {
        self.write_frames(self.frames.len())
    }

    /// Index of the last frame that may be written now.
    fn last_frameset_index(&mut self) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        let last = self.frames.len() - 1;

        let now = self.clock.now();
        let idle = now.saturating_duration_since(self.last_activity) > self.config.activity_timeout;
        if self.frames.len() > self.config.max_frameset_size || idle {
            self.last_activity = now;
            return Some(last);
        }
        if self.frames.iter().all(|f| f.kind == FrameKind::Unknown) {
            return Some(last);
        }
        // frames before the newest IDR form a complete frameset
        match self.frames.iter().rposition(|f| f.kind == FrameKind::Idr) {
            Some(idr) if idr > 0 => Some(idr - 1),
            _ => None,
        }
    }

    fn write_frames(&mut self, count: usize) -> io::Result<()> {
        if count == 0 {
            return Ok(());
        }
        self.open_file()?;
        let Some(file) = self.current.as_mut() else {
            return Err(io::Error::other("temp file unavailable"));
        };
        // counters track what reached the writer, frame by frame
        for (i, frame) in self.frames.drain(..count).enumerate() {
            if let Err(e) = file.writer.write_all(&frame.bytes) {
                warn!("Dropping {} buffered frame(s) after failed write to {}", count - i, file.path.display());
                return Err(e);
            }
            let len = frame.bytes.len() as u64;
            file.bytes_written += len;
            self.stats.bytes_written += len;
        }
        file.writer.flush()
    }

    fn open_file(&mut self) -> io::Result<()> {
        if self.current.is_none() {
            let path = self.temp_files.generate()?;
            let writer = self.streams.open(&path)?;
            debug!("Buffering transport stream into {}", path.display());
            self.current = Some(OutputFile { path, created: self.clock.now(), bytes_written: 0, writer });
        }
        Ok(())
    }

    /// Releases the current file if it holds any bytes.
    fn take_file(&mut self) -> io::Result<Option<PathBuf>> {
        match self.current.take() {
            Some(file) if file.bytes_written > 0 => {
                let OutputFile { path, mut writer, .. } = file;
                writer.flush()?;
                self.stats.files_written += 1;
                Ok(Some(path))
            }
            other => {
                self.current = other;
                Ok(None)
            }
        }
    }

    fn log_activity(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_activity_log) >= ACTIVITY_LOG_PERIOD {
            let s = self.stats;
            info!(
                "Buffer activity: {} bytes / {} packets received, {} bytes / {} files written",
                s.bytes_received, s.packets_received, s.bytes_written, s.files_written
            );
            self.last_activity_log = now;
        }
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new(BufferConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::output::memory::MemoryOutput;
    use super::*;

    fn buffer(config: BufferConfig) -> (PacketBuffer, MemoryOutput, ManualClock) {
        let output = MemoryOutput::default();
        let clock = ManualClock::new();
        let buffer = PacketBuffer::new(config)
            .with_temp_files(output.temp_files())
            .with_output(output.clone())
            .with_clock(clock.clone());
        (buffer, output, clock)
    }

    fn always() -> RolloverCondition {
        RolloverCondition::ByteCount { bytes: 0 }
    }

    fn never() -> RolloverCondition {
        RolloverCondition::ByteCount { bytes: u64::MAX }
    }

    #[test]
    fn test_flushes_up_to_last_idr() {
        let (mut buffer, output, _) = buffer(BufferConfig::default());
        buffer.write(b"abc").unwrap();
        buffer.frame_complete(FrameKind::Idr).unwrap();
        buffer.write(b"def").unwrap();
        buffer.frame_complete(FrameKind::NonIdr).unwrap();
        buffer.write(b"ghi").unwrap();
        buffer.frame_complete(FrameKind::NonIdr).unwrap();
        assert_eq!(buffer.byte_count(), 0);
        buffer.write(b"jkl").unwrap();
        buffer.frame_complete(FrameKind::Idr).unwrap();

        let result = buffer.rotate(&always()).unwrap();
        assert!(!result.timed_out);
        let path = result.file.unwrap();
        assert_eq!(output.contents(&path).unwrap(), b"abcdefghi");
        assert_eq!(buffer.buffered_frames(), 1);
        assert_eq!(buffer.stats().files_written, 1);
    }

    #[test]
    fn test_no_file_without_frame_markers() {
        let (mut buffer, output, clock) = buffer(BufferConfig::default());
        for _ in 0..100 {
            buffer.write(&[0x47; 188]).unwrap();
        }
        clock.advance(Duration::from_secs(5));
        let result = buffer.rotate(&always()).unwrap();
        assert_eq!(result, RotateResult::default());
        assert_eq!(buffer.flush_and_rotate().unwrap().map(|p| output.contents(&p).unwrap().len()), Some(18_800));
    }

    #[test]
    fn test_inactivity_forces_rotation() {
        let (mut buffer, output, clock) = buffer(BufferConfig::default());
        buffer.write(b"abc").unwrap();
        buffer.frame_complete(FrameKind::Idr).unwrap();
        buffer.write(b"def").unwrap();

        assert_eq!(buffer.rotate(&never()).unwrap(), RotateResult::default());
        clock.advance(Duration::from_millis(1500));

        let result = buffer.rotate(&never()).unwrap();
        assert!(result.timed_out);
        assert_eq!(output.contents(&result.file.unwrap()).unwrap(), b"abcdef");

        // a second idle check does not signal again
        clock.advance(Duration::from_secs(2));
        assert_eq!(buffer.rotate(&never()).unwrap(), RotateResult::default());
    }

    #[test]
    fn test_incomplete_overflow_is_unknown_frame() {
        let config = BufferConfig { max_incomplete_frame_bytes: 1, ..BufferConfig::default() };
        let (mut buffer, output, _) = buffer(config);
        buffer.write(b"x").unwrap();
        assert_eq!(buffer.byte_count(), 0);
        buffer.write(b"yz").unwrap();
        assert_eq!(buffer.byte_count(), 3);
        assert_eq!(buffer.incomplete_len(), 0);

        let path = buffer.rotate(&always()).unwrap().file.unwrap();
        assert_eq!(output.contents(&path).unwrap(), b"xyz");
    }

    #[test]
    fn test_frameset_size_limit_flushes_everything() {
        let config = BufferConfig { max_frameset_size: 2, ..BufferConfig::default() };
        let (mut buffer, _, _) = buffer(config);
        for chunk in [b"a", b"b", b"c"] {
            buffer.write(chunk).unwrap();
            buffer.frame_complete(FrameKind::NonIdr).unwrap();
        }
        assert_eq!(buffer.byte_count(), 3);
        assert_eq!(buffer.buffered_frames(), 0);
    }

    #[test]
    fn test_non_idr_frames_wait_for_idr() {
        let (mut buffer, _, _) = buffer(BufferConfig::default());
        buffer.write(b"a").unwrap();
        buffer.frame_complete(FrameKind::NonIdr).unwrap();
        buffer.write(b"b").unwrap();
        buffer.frame_complete(FrameKind::NonIdr).unwrap();
        assert_eq!(buffer.byte_count(), 0);
        buffer.write(b"c").unwrap();
        buffer.frame_complete(FrameKind::Idr).unwrap();
        assert_eq!(buffer.byte_count(), 2);
    }

    #[test]
    fn test_condition_not_ready_keeps_file() {
        let (mut buffer, output, clock) = buffer(BufferConfig::default());
        buffer.write(b"ab").unwrap();
        buffer.frame_complete(FrameKind::Idr).unwrap();
        buffer.write(b"cd").unwrap();
        buffer.frame_complete(FrameKind::Idr).unwrap();

        let elapsed = RolloverCondition::elapsed(Duration::from_secs(30)).unwrap();
        assert_eq!(buffer.rotate(&elapsed).unwrap().file, None);
        assert_eq!(buffer.state().byte_count, 2);

        clock.advance(Duration::from_millis(500));
        buffer.write(b"ef").unwrap();
        clock.advance(Duration::from_secs(30));
        buffer.write(b"gh").unwrap();
        let path = buffer.rotate(&elapsed).unwrap().file.unwrap();
        assert_eq!(output.contents(&path).unwrap(), b"ab");
        assert_eq!(output.file_count(), 1);
    }

    #[test]
    fn test_reset_deletes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = PacketBuffer::default().with_temp_files(SystemTempFiles::in_dir(dir.path()));
        buffer.write(b"abc").unwrap();
        buffer.frame_complete(FrameKind::Unknown).unwrap();
        assert_eq!(buffer.byte_count(), 3);
        let leftover: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftover.len(), 1);

        buffer.reset();
        assert_eq!(buffer.byte_count(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_flush_and_rotate_writes_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = PacketBuffer::default().with_temp_files(SystemTempFiles::in_dir(dir.path()));
        buffer.write(b"abc").unwrap();
        buffer.frame_complete(FrameKind::Idr).unwrap();
        buffer.write(b"def").unwrap();

        let path = buffer.flush_and_rotate().unwrap().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
        assert_eq!(buffer.flush_and_rotate().unwrap(), None);
    }

    /// Accepts `limit` writes, then fails every later one.
    struct ShortWriter {
        limit: usize,
        writes: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            if self.writes > self.limit {
                return Err(io::Error::other("disk full"));
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_byte_count_matches_partial_write() {
        let output = MemoryOutput::default();
        let streams = |_: &std::path::Path| -> io::Result<Box<dyn Write + Send>> {
            Ok(Box::new(ShortWriter { limit: 1, writes: 0 }))
        };
        let mut buffer = PacketBuffer::default().with_temp_files(output.temp_files()).with_output(streams);
        buffer.write(b"abc").unwrap();
        buffer.frame_complete(FrameKind::Idr).unwrap();
        buffer.write(b"defg").unwrap();
        buffer.frame_complete(FrameKind::NonIdr).unwrap();
        buffer.write(b"hi").unwrap();
        assert!(buffer.frame_complete(FrameKind::Idr).is_err());

        assert_eq!(buffer.byte_count(), 3);
        assert_eq!(buffer.stats().bytes_written, 3);
        assert_eq!(buffer.buffered_frames(), 1);

        // the partially written file is still handed over
        let result = buffer.rotate(&always()).unwrap();
        assert!(result.file.is_some());
    }
}
