//! First-use initialization and reset.
//!
//! `grove init` establishes the configuration file and an empty status
//! document, prompting for the base path unless running non-interactively.
//! `grove init --reset` reinitializes the status document after an explicit
//! confirmation (suppressed by `--force`).

use std::path::PathBuf;

use crate::config::{Config, config_file_path};
use crate::error::{Error, Result};
use crate::fs::Filesystem;
use crate::prompt::{Prompt, prompt_for_base_path, prompt_for_confirmation};
use crate::status::{FileBackend, StatusStore};

pub const DEFAULT_BASE_DIR: &str = "~/Code";

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub base_path: Option<String>,
    pub reset: bool,
    pub force: bool,
    pub non_interactive: bool,
}

/// Run init or reset. Returns the resulting configuration.
pub fn run(fs: &dyn Filesystem, prompt: &dyn Prompt, opts: &InitOptions) -> Result<Config> {
    let config_path = config_file_path()?;

    if opts.reset {
        return reset(fs, prompt, &config_path, opts);
    }

    if fs.exists(&config_path) {
        return Err(Error::AlreadyInitialized);
    }

    let base_input = match &opts.base_path {
        Some(path) => path.clone(),
        None if opts.non_interactive => DEFAULT_BASE_DIR.to_string(),
        None => {
            let default = fs.expand_path(DEFAULT_BASE_DIR)?;
            prompt_for_base_path(prompt, &default)?
        }
    };
    let base_path: PathBuf = fs.expand_path(&base_input)?;

    let config = Config {
        non_interactive: opts.non_interactive,
        ..Config::defaults_under(&base_path, &config_path)
    };
    config.save_to(&config_path)?;
    fs.create_dir_all(&config.repositories_dir)?;
    fs.create_dir_all(&config.workspaces_dir)?;

    // Materialize the empty status document so later runs load cleanly.
    let mut store = StatusStore::open(Box::new(FileBackend::open(&config.status_file)?))?;
    store.persist()?;

    Ok(config)
}

fn reset(
    fs: &dyn Filesystem,
    prompt: &dyn Prompt,
    config_path: &std::path::Path,
    opts: &InitOptions,
) -> Result<Config> {
    if !fs.exists(config_path) {
        return Err(Error::NotInitialized);
    }
    let config = Config::load_from(config_path)?;

    if !opts.force && !opts.non_interactive {
        let accepted = prompt_for_confirmation(
            prompt,
            "Reset the status document? Tracked repositories and workspaces will be forgotten.",
            false,
        )?;
        if !accepted {
            return Err(Error::UserCancelled);
        }
    } else if !opts.force && opts.non_interactive {
        return Err(Error::InvalidInput {
            reason: "--reset without --force needs confirmation".to_string(),
        });
    }

    let mut store = StatusStore::open(Box::new(FileBackend::open(&config.status_file)?))
        .or_else(|e| match e {
            // A corrupt document is exactly what reset is for.
            Error::SchemaMismatch { .. } => {
                std::fs::remove_file(&config.status_file).map_err(Error::Io)?;
                StatusStore::open(Box::new(FileBackend::open(&config.status_file)?))
            }
            other => Err(other),
        })?;
    store.reset()?;
    Ok(config)
}
