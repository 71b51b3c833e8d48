//! IDE launcher port.
//!
//! Opening an editor is a hook effect, never a core concern. The production
//! adapter spawns `<ide> <path>` detached and does not wait for it.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

pub trait Ide: Send + Sync {
    /// Open `path` (a directory or workspace file) in the named IDE.
    fn open(&self, ide_name: &str, path: &Path, verbose: bool) -> Result<()>;
}

/// Spawns the IDE command found on `PATH` (e.g. `code`, `cursor`, `zed`).
pub struct CommandIde;

impl CommandIde {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CommandIde {
    fn default() -> Self {
        Self::new()
    }
}

impl Ide for CommandIde {
    fn open(&self, ide_name: &str, path: &Path, verbose: bool) -> Result<()> {
        if verbose {
            log::info!("opening {} with {ide_name}", path.display());
        }
        log::debug!("$ {ide_name} {}", path.display());
        Command::new(ide_name)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(Error::Io)?;
        Ok(())
    }
}
