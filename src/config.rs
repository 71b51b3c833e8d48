//! Configuration for grove.
//!
//! A single TOML file at `~/.config/grove/config.toml` (platform
//! equivalent) holding the filesystem roots and the status file location:
//!
//! ```toml
//! repositories-dir = "/home/alex/Code/repositories"
//! workspaces-dir = "/home/alex/Code/workspaces"
//! status-file = "/home/alex/.config/grove/status.json"
//! non-interactive = false
//! ```
//!
//! The file is created by `grove init`; loading before init fails with
//! `NotInitialized`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Directory name under the platform config dir.
const CONFIG_DIR_NAME: &str = "grove";
const CONFIG_FILE_NAME: &str = "config.toml";
const STATUS_FILE_NAME: &str = "status.json";

/// Base-path override set by `--config`, for tests and scripting.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Override the config file location. Call once at startup, before any load.
pub fn set_config_path(path: PathBuf) {
    CONFIG_PATH.set(path).ok();
}

/// The config file location: the `--config` override when set, otherwise
/// `<platform config dir>/grove/config.toml`.
pub fn config_file_path() -> Result<PathBuf> {
    if let Some(path) = CONFIG_PATH.get() {
        return Ok(path.clone());
    }
    let base = dirs::config_dir().ok_or_else(|| {
        Error::Io(std::io::Error::other(
            "could not determine the platform configuration directory",
        ))
    })?;
    Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Root for per-repository worktree trees.
    #[serde(rename = "repositories-dir")]
    pub repositories_dir: PathBuf,

    /// Root for workspace manifest files.
    #[serde(rename = "workspaces-dir")]
    pub workspaces_dir: PathBuf,

    /// Absolute path of the persisted status document.
    #[serde(rename = "status-file")]
    pub status_file: PathBuf,

    /// When true, prompts are suppressed and defaults are used.
    #[serde(default, rename = "non-interactive")]
    pub non_interactive: bool,
}

impl Config {
    /// Defaults rooted at a base path (typically `~/Code`); the status file
    /// lives next to the config file.
    pub fn defaults_under(base_path: &Path, config_file: &Path) -> Self {
        let status_file = config_file
            .parent()
            .map(|dir| dir.join(STATUS_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(STATUS_FILE_NAME));
        Self {
            repositories_dir: base_path.join("repositories"),
            workspaces_dir: base_path.join("workspaces"),
            status_file,
            non_interactive: false,
        }
    }

    /// Load from the configured location. Missing file means grove has not
    /// been initialized.
    pub fn load() -> Result<Self> {
        let path = config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotInitialized);
            }
            Err(e) => return Err(Error::Io(e)),
        };
        toml::from_str(&contents).map_err(|e| Error::SchemaMismatch {
            location: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(Error::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "could not serialize configuration: {e}"
            )))
        })?;
        std::fs::write(path, contents).map_err(Error::Io)
    }
}
