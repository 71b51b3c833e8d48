//! Branch name sanitization.
//!
//! Branch names may contain `/` (mapped to nested directories by the path
//! builder) but never `:` (reserved for the `remote:branch` worktree key) or
//! `\` (ambiguous as a path separator on Windows).

use crate::error::{Error, Result};

/// Validate and normalize a branch name.
///
/// Trims surrounding whitespace and rejects empty names and names containing
/// `:` or `\`.
pub fn sanitize(branch: &str) -> Result<String> {
    let trimmed = branch.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidBranch {
            branch: branch.to_string(),
            reason: "branch name is empty".to_string(),
        });
    }
    if trimmed.contains(':') {
        return Err(Error::InvalidBranch {
            branch: branch.to_string(),
            reason: "branch name must not contain ':'".to_string(),
        });
    }
    if trimmed.contains('\\') {
        return Err(Error::InvalidBranch {
            branch: branch.to_string(),
            reason: "branch name must not contain '\\'".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Sanitize a branch name for use as a single filename component.
///
/// Like [`sanitize`], but additionally replaces `/` with `-` so
/// `feature/foo` becomes `feature-foo`.
pub fn sanitize_for_filename(branch: &str) -> Result<String> {
    Ok(sanitize(branch)?.replace('/', "-"))
}
