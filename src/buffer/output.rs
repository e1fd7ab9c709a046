//! Where buffered transport bytes are written.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::constants::{TEMP_FILE_PREFIX, TEMP_FILE_SUFFIX};

/// Creates the path of a fresh temp file.
pub trait TempFileGenerator: Send {
    fn generate(&self) -> io::Result<PathBuf>;
}

impl<F> TempFileGenerator for F
where
    F: Fn() -> io::Result<PathBuf> + Send,
{
    fn generate(&self) -> io::Result<PathBuf> {
        self()
    }
}

/// Opens a writer that appends to `path`.
pub trait OutputStreamFactory: Send {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
}

impl<F> OutputStreamFactory for F
where
    F: Fn(&Path) -> io::Result<Box<dyn Write + Send>> + Send,
{
    fn open(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        self(path)
    }
}

/// Named temp files under the system temp dir or a chosen directory.
/// The file outlives the generator; the rotator removes it.
#[derive(Debug, Clone, Default)]
pub struct SystemTempFiles {
    dir: Option<PathBuf>,
}

impl SystemTempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }
}

impl TempFileGenerator for SystemTempFiles {
    fn generate(&self) -> io::Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX).suffix(TEMP_FILE_SUFFIX);
        let file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppendFileFactory;

impl OutputStreamFactory for AppendFileFactory {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Box::new(io::BufWriter::new(file)))
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    type Files = Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>;

    /// In-memory files keyed by path, for deterministic buffer tests.
    #[derive(Clone, Default)]
    pub struct MemoryOutput {
        files: Files,
        next: Arc<AtomicUsize>,
    }

    impl MemoryOutput {
        pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
            self.files.lock().get(path).cloned()
        }

        pub fn file_count(&self) -> usize {
            self.files.lock().len()
        }

        pub fn temp_files(&self) -> impl Fn() -> io::Result<PathBuf> + Send + use<> {
            let next = Arc::clone(&self.next);
            move || Ok(PathBuf::from(format!("mem-{}.ts", next.fetch_add(1, Ordering::SeqCst))))
        }
    }

    struct MemoryWriter {
        path: PathBuf,
        files: Files,
    }

    impl Write for MemoryWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.files.lock().entry(self.path.clone()).or_default().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl OutputStreamFactory for MemoryOutput {
        fn open(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
            self.files.lock().entry(path.to_path_buf()).or_default();
            Ok(Box::new(MemoryWriter { path: path.to_path_buf(), files: Arc::clone(&self.files) }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_system_temp_files_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = SystemTempFiles::in_dir(dir.path()).generate().unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(TEMP_FILE_PREFIX));
        assert!(name.ends_with(TEMP_FILE_SUFFIX));
    }

    #[test]
    fn test_append_factory_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ts");
        for chunk in [&b"abc"[..], b"def"] {
            let mut out = AppendFileFactory.open(&path).unwrap();
            out.write_all(chunk).unwrap();
            out.flush().unwrap();
        }
        assert_eq!(fs::read(&path).unwrap(), b"abcdef");
    }
}
