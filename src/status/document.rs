//! Serde model of the status document.
//!
//! Maps are `IndexMap` so the persisted JSON keeps insertion order and
//! round-trips byte-for-byte. The document is schema-versioned; loading a
//! different version surfaces `SchemaMismatch` instead of guessing.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::forge::IssueInfo;

/// Current schema version of the persisted document.
pub const SCHEMA_VERSION: u32 = 1;

/// Key of a worktree inside a repository: `<remote>:<branch>`.
pub fn worktree_key(remote: &str, branch: &str) -> String {
    format!("{remote}:{branch}")
}

/// One materialized worktree of a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorktreeInfo {
    pub remote: String,
    pub branch: String,
    /// Absolute path of the per-worktree workspace file, when this worktree
    /// was created as part of a workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    /// Forge metadata snapshot taken at creation time.
    #[serde(
        default,
        rename = "issue_info",
        skip_serializing_if = "Option::is_none"
    )]
    pub issue: Option<IssueInfo>,
}

impl WorktreeInfo {
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
            workspace: None,
            issue: None,
        }
    }

    pub fn key(&self) -> String {
        worktree_key(&self.remote, &self.branch)
    }
}

/// A tracked repository: its primary clone path and its worktrees, keyed by
/// `<remote>:<branch>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub path: PathBuf,
    #[serde(default)]
    pub worktrees: IndexMap<String, WorktreeInfo>,
}

impl Repository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            worktrees: IndexMap::new(),
        }
    }
}

/// A named group of repositories sharing per-branch worktree materialization.
///
/// `worktrees` holds plain branch names; the remote for each member is
/// recovered from that member's `WorktreeInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub repositories: Vec<String>,
    #[serde(default)]
    pub worktrees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDocument {
    pub version: u32,
    #[serde(default)]
    pub repositories: IndexMap<String, Repository>,
    #[serde(default)]
    pub workspaces: IndexMap<String, Workspace>,
}

impl Default for StatusDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            repositories: IndexMap::new(),
            workspaces: IndexMap::new(),
        }
    }
}
