//! Deterministic path construction for worktrees and workspace files.
//!
//! All paths derive from two configured roots: `repositories_dir` holds one
//! tree per repository (`<repo id>/<remote>/<branch>`), `workspaces_dir`
//! holds `.code-workspace` manifests. Pure functions over strings and
//! `PathBuf`s; nothing here touches the filesystem.

use std::path::{Path, PathBuf};

use crate::branch;
use crate::error::Result;

/// Extension used for workspace manifest files.
pub const WORKSPACE_FILE_EXT: &str = "code-workspace";

#[derive(Debug, Clone)]
pub struct PathBuilder {
    repositories_dir: PathBuf,
    workspaces_dir: PathBuf,
}

impl PathBuilder {
    pub fn new(repositories_dir: impl Into<PathBuf>, workspaces_dir: impl Into<PathBuf>) -> Self {
        Self {
            repositories_dir: repositories_dir.into(),
            workspaces_dir: workspaces_dir.into(),
        }
    }

    /// Worktree directory for `(repo id, remote, branch)`:
    /// `<repositories_dir>/<repo id>/<remote>/<branch>`.
    ///
    /// Both the repository id (`host/owner/name`) and a branch containing `/`
    /// contribute nested directories, so the components are pushed one by one
    /// rather than joined as raw strings.
    pub fn worktree_path(&self, repo_id: &str, remote: &str, branch: &str) -> Result<PathBuf> {
        let branch = branch::sanitize(branch)?;
        let mut path = self.repositories_dir.clone();
        for segment in repo_id.split('/') {
            path.push(segment);
        }
        path.push(remote);
        for segment in branch.split('/') {
            path.push(segment);
        }
        Ok(path)
    }

    /// Root of a repository's worktree tree: `<repositories_dir>/<repo id>`.
    pub fn repository_root(&self, repo_id: &str) -> PathBuf {
        let mut path = self.repositories_dir.clone();
        for segment in repo_id.split('/') {
            path.push(segment);
        }
        path
    }

    /// Main manifest for a workspace: `<workspaces_dir>/<name>.code-workspace`.
    pub fn workspace_file_path(&self, name: &str) -> PathBuf {
        self.workspaces_dir
            .join(format!("{name}.{WORKSPACE_FILE_EXT}"))
    }

    /// Per-branch manifest for a workspace worktree:
    /// `<workspaces_dir>/<workspace>-<branch>.code-workspace`, with `/` in the
    /// branch replaced by `-`.
    pub fn worktree_workspace_file_path(&self, workspace: &str, branch: &str) -> Result<PathBuf> {
        let branch = branch::sanitize_for_filename(branch)?;
        Ok(self
            .workspaces_dir
            .join(format!("{workspace}-{branch}.{WORKSPACE_FILE_EXT}")))
    }

    pub fn repositories_dir(&self) -> &Path {
        &self.repositories_dir
    }

    pub fn workspaces_dir(&self) -> &Path {
        &self.workspaces_dir
    }
}
