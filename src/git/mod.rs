//! Git capability port.
//!
//! The core never invokes git directly; every git interaction goes through
//! the [`Git`] trait so tests can substitute a scripted fake. [`CliGit`] is
//! the production adapter shelling out to the `git` binary.

use std::path::Path;

use crate::error::Result;

mod cli;
mod url;

pub use cli::CliGit;
pub use url::{GitUrl, UrlScheme, normalize_identifier};

/// Capability interface over a git installation.
///
/// All paths are the repository to operate in (any directory inside it).
/// Adapters surface failures as [`crate::error::Error::Git`] carrying the
/// command line and trimmed stderr.
pub trait Git: Send + Sync {
    /// Porcelain status output, one line per changed path.
    fn status(&self, repo: &Path) -> Result<String>;

    /// True when the working tree has no uncommitted or untracked changes.
    fn is_clean(&self, repo: &Path) -> Result<bool>;

    /// True when `path` is inside a git repository work tree.
    fn is_git_repository(&self, path: &Path) -> bool;

    fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool>;

    /// True when the remote advertises `refs/heads/<branch>`.
    fn branch_exists_on_remote(&self, repo: &Path, remote: &str, branch: &str) -> Result<bool>;

    /// Create a local branch, optionally from a start point such as
    /// `origin/feature`.
    fn create_branch(&self, repo: &Path, branch: &str, start_point: Option<&str>) -> Result<()>;

    /// The remote a branch tracks, if any.
    fn get_branch_remote(&self, repo: &Path, branch: &str) -> Result<Option<String>>;

    fn create_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()>;

    fn remove_worktree(&self, repo: &Path, path: &Path, force: bool) -> Result<()>;

    fn remote_exists(&self, repo: &Path, remote: &str) -> Result<bool>;

    fn add_remote(&self, repo: &Path, name: &str, url: &str) -> Result<()>;

    fn remove_remote(&self, repo: &Path, name: &str) -> Result<()>;

    fn get_remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>>;

    fn fetch_remote(&self, repo: &Path, remote: &str) -> Result<()>;

    /// Repository name as advertised by the origin remote, falling back to
    /// the directory name.
    fn get_repository_name(&self, repo: &Path) -> Result<String>;

    /// Default branch advertised by a remote URL (`HEAD` symref).
    fn remote_default_branch(&self, url: &str) -> Result<String>;

    fn clone(&self, url: &str, target: &Path) -> Result<()>;
}
