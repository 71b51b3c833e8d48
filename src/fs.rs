//! Filesystem capability port.
//!
//! Drivers never touch `std::fs` directly; they go through [`Filesystem`] so
//! the full pipeline can run against an in-memory fake. [`OsFilesystem`] is
//! the production adapter.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a file or directory tree. Missing paths are not an error.
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Paths matching a glob pattern, sorted for deterministic output.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    fn read_file(&self, path: &Path) -> Result<String>;

    /// Write via a temporary file in the target directory, fsync, then
    /// rename over the destination.
    fn write_file_atomic(&self, path: &Path, contents: &str) -> Result<()>;

    /// Canonicalize an existing path.
    fn resolve_path(&self, path: &Path) -> Result<PathBuf>;

    /// Expand `~` and environment-style prefixes in user input.
    fn expand_path(&self, input: &str) -> Result<PathBuf>;

    fn home_dir(&self) -> Option<PathBuf>;

    fn current_dir(&self) -> Result<PathBuf>;

    /// Check that a path exists, is a directory, and contains a `.git` entry.
    fn validate_repository_path(&self, path: &Path) -> Result<()>;
}

pub struct OsFilesystem;

impl OsFilesystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OsFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for OsFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(Error::Io)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        if path.is_dir() {
            std::fs::remove_dir_all(path).map_err(Error::Io)
        } else {
            std::fs::remove_file(path).map_err(Error::Io)
        }
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let entries = glob::glob(pattern).map_err(|e| Error::InvalidInput {
            reason: format!("bad glob pattern '{pattern}': {e}"),
        })?;
        let mut paths: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
        paths.sort();
        Ok(paths)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(Error::Io)
    }

    fn write_file_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let dir = path.parent().ok_or_else(|| {
            Error::Io(std::io::Error::other(format!(
                "{} has no parent directory",
                path.display()
            )))
        })?;
        std::fs::create_dir_all(dir).map_err(Error::Io)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(Error::Io)?;
        tmp.write_all(contents.as_bytes()).map_err(Error::Io)?;
        tmp.as_file().sync_all().map_err(Error::Io)?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        dunce::canonicalize(path).map_err(Error::Io)
    }

    fn expand_path(&self, input: &str) -> Result<PathBuf> {
        let expanded = shellexpand::tilde(input);
        Ok(PathBuf::from(expanded.as_ref()))
    }

    fn home_dir(&self) -> Option<PathBuf> {
        home::home_dir()
    }

    fn current_dir(&self) -> Result<PathBuf> {
        std::env::current_dir().map_err(Error::Io)
    }

    fn validate_repository_path(&self, path: &Path) -> Result<()> {
        if !self.is_dir(path) {
            return Err(Error::RepositoryNotFound {
                name: path.display().to_string(),
            });
        }
        if !self.exists(&path.join(".git")) {
            return Err(Error::GitRepositoryNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}
