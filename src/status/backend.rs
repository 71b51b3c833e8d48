//! Persistence seam for the status store.
//!
//! [`FileBackend`] is the production implementation: atomic
//! temp-file-then-rename replacement with an fsync before the rename, plus
//! an advisory lock on a sibling `.lock` file so a second grove process
//! fails fast instead of corrupting the document. [`MemoryBackend`] backs
//! tests.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;

use crate::error::{Error, Result};

pub trait StatusBackend: Send + Sync {
    /// Read the persisted document, `None` when it does not exist yet.
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, contents: &str) -> Result<()>;

    /// Human-readable location for error messages.
    fn location(&self) -> String;
}

pub struct FileBackend {
    path: PathBuf,
    /// Held for the lifetime of the backend; the OS releases it on drop.
    _lock: File,
}

impl FileBackend {
    /// Open the backend, creating parent directories and taking the advisory
    /// lock. A lock held elsewhere means another grove process is running.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(Error::Io)?;
        }
        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(Error::Io)?;
        lock.try_lock_exclusive().map_err(|_| {
            Error::Io(std::io::Error::other(format!(
                "status file {} is locked by another grove process",
                path.display()
            )))
        })?;
        Ok(Self { path, _lock: lock })
    }
}

impl StatusBackend for FileBackend {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn save(&self, contents: &str) -> Result<()> {
        let dir = self.path.parent().ok_or_else(|| {
            Error::Io(std::io::Error::other(format!(
                "{} has no parent directory",
                self.path.display()
            )))
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(Error::Io)?;
        tmp.write_all(contents.as_bytes()).map_err(Error::Io)?;
        tmp.as_file().sync_all().map_err(Error::Io)?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend for tests and dry runs.
#[derive(Default)]
pub struct MemoryBackend {
    contents: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    /// Current persisted contents, for assertions.
    pub fn snapshot(&self) -> Option<String> {
        self.contents.lock().unwrap().clone()
    }
}

impl StatusBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.contents.lock().unwrap().clone())
    }

    fn save(&self, contents: &str) -> Result<()> {
        *self.contents.lock().unwrap() = Some(contents.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
