//! Invocation-context resolution: single repository, workspace, or neither.
//!
//! Explicit selectors always win. Without them, a `.git` directory in the
//! working directory means single-repo mode, and `.code-workspace` files
//! mean workspace mode (prompting when several are present). The resolver
//! only inspects inputs and the filesystem port, never the status store.

use std::path::Path;

use crate::error::{Error, Result};
use crate::fs::Filesystem;
use crate::paths::WORKSPACE_FILE_EXT;
use crate::prompt::{Prompt, prompt_for_selection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    SingleRepo,
    Workspace(String),
    None,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::SingleRepo => write!(f, "repository"),
            Mode::Workspace(name) => write!(f, "workspace '{name}'"),
            Mode::None => write!(f, "none"),
        }
    }
}

/// Explicit selectors from the command line.
#[derive(Debug, Clone, Default)]
pub struct Selectors {
    pub workspace_name: Option<String>,
    pub repository_name: Option<String>,
}

/// Resolve the mode for the current invocation.
pub fn resolve(
    fs: &dyn Filesystem,
    prompt: &dyn Prompt,
    cwd: &Path,
    selectors: &Selectors,
) -> Result<Mode> {
    if let Some(name) = &selectors.workspace_name {
        return Ok(Mode::Workspace(name.clone()));
    }
    if selectors.repository_name.is_some() {
        return Ok(Mode::SingleRepo);
    }
    if fs.is_dir(&cwd.join(".git")) {
        return Ok(Mode::SingleRepo);
    }

    let pattern = format!("{}/*.{}", cwd.display(), WORKSPACE_FILE_EXT);
    let workspace_files = fs.glob(&pattern)?;
    let names: Vec<String> = workspace_files
        .iter()
        .filter_map(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(&format!(".{WORKSPACE_FILE_EXT}")))
                .map(|n| n.to_string())
        })
        .collect();

    match names.as_slice() {
        [] => Ok(Mode::None),
        [only] => Ok(Mode::Workspace(only.clone())),
        _ => {
            let index = prompt_for_selection(prompt, "Several workspace files found", &names)?;
            Ok(Mode::Workspace(names[index].clone()))
        }
    }
}

/// Reject the combination of explicit workspace and repository selectors.
pub fn validate_selectors(selectors: &Selectors) -> Result<()> {
    if selectors.workspace_name.is_some() && selectors.repository_name.is_some() {
        return Err(Error::InvalidInput {
            reason: "--workspace and --repository are mutually exclusive".to_string(),
        });
    }
    Ok(())
}
