//! Per-repository operations: worktree lifecycle and cloning.
//!
//! The driver owns nothing: capability ports and the status store are
//! borrowed from the orchestrator for the duration of one operation. Side
//! effects follow a fixed order (status reservation, directory creation,
//! git worktree command, status commit) with an explicit rollback list
//! unwound in reverse on failure.

use std::path::{Path, PathBuf};

use crate::branch;
use crate::error::{Error, Result};
use crate::fs::Filesystem;
use crate::git::{Git, GitUrl};
use crate::paths::PathBuilder;
use crate::prompt::{Prompt, prompt_for_confirmation};
use crate::rollback::{Rollback, UndoAction};
use crate::status::{StatusStore, WorktreeInfo};

pub const DEFAULT_REMOTE: &str = "origin";

/// Inputs for creating a worktree.
#[derive(Debug, Clone, Default)]
pub struct CreateWorktree {
    pub branch: String,
    /// Remote the branch belongs to; defaults to `origin`.
    pub remote: Option<String>,
    /// When set, the branch is created from `<remote>/<branch>` instead of
    /// `HEAD` (load flow).
    pub from_remote: bool,
    /// Workspace file path recorded on the entry when part of a workspace.
    pub workspace_file: Option<PathBuf>,
    pub issue: Option<crate::forge::IssueInfo>,
    pub force: bool,
}

pub struct RepositoryDriver<'a> {
    fs: &'a dyn Filesystem,
    git: &'a dyn Git,
    prompt: &'a dyn Prompt,
    paths: &'a PathBuilder,
    store: &'a mut StatusStore,
    /// Directory of the primary clone (or any directory inside it).
    root: PathBuf,
}

impl<'a> RepositoryDriver<'a> {
    pub fn new(
        fs: &'a dyn Filesystem,
        git: &'a dyn Git,
        prompt: &'a dyn Prompt,
        paths: &'a PathBuilder,
        store: &'a mut StatusStore,
        root: PathBuf,
    ) -> Self {
        Self {
            fs,
            git,
            prompt,
            paths,
            store,
            root,
        }
    }

    pub fn is_git_repository(&self) -> bool {
        self.git.is_git_repository(&self.root)
    }

    /// The repository must be a git work tree with a parseable origin.
    pub fn validate(&self) -> Result<()> {
        if !self.is_git_repository() {
            return Err(Error::GitRepositoryNotFound {
                path: self.root.clone(),
            });
        }
        self.origin_url()?;
        Ok(())
    }

    /// Parsed URL of the `origin` remote.
    pub fn origin_url(&self) -> Result<GitUrl> {
        let url = self
            .git
            .get_remote_url(&self.root, DEFAULT_REMOTE)?
            .ok_or(Error::OriginRemoteNotFound)?;
        GitUrl::parse(&url).map_err(|_| Error::OriginRemoteInvalidUrl { url })
    }

    /// Canonical repository id derived from origin.
    pub fn canonical_id(&self) -> Result<String> {
        Ok(self.origin_url()?.canonical_id())
    }

    /// Create a worktree for a branch. Returns the absolute worktree path.
    pub fn create_worktree(&mut self, request: CreateWorktree) -> Result<PathBuf> {
        let branch_name = branch::sanitize(&request.branch)?;
        let remote = request
            .remote
            .clone()
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());

        self.validate()?;
        let repo_id = self.canonical_id()?;

        // Fail-fast preconditions, in order: duplicate entry, dirty tree,
        // existing directory.
        if let Some(repo) = self.store.get_repository(&repo_id)
            && repo
                .worktrees
                .contains_key(&crate::status::worktree_key(&remote, &branch_name))
        {
            return Err(Error::WorktreeExists {
                remote,
                branch: branch_name,
            });
        }
        if !request.force && !self.git.is_clean(&self.root)? {
            return Err(Error::RepositoryNotClean {
                path: self.root.clone(),
            });
        }
        let target = self.paths.worktree_path(&repo_id, &remote, &branch_name)?;
        if self.fs.exists(&target) {
            return Err(Error::DirectoryExists { path: target });
        }

        self.store.add_repository(&repo_id, &self.root)?;

        // Reserve the entry first so a concurrent invocation observes it.
        let mut info = WorktreeInfo::new(remote.clone(), branch_name.clone());
        info.workspace = request.workspace_file.clone();
        info.issue = request.issue.clone();
        self.store.add_worktree(&repo_id, info)?;

        let mut rollback = Rollback::new();
        rollback.push(UndoAction::WorktreeEntry {
            repo_id: repo_id.clone(),
            branch: branch_name.clone(),
        });

        match self.materialize_worktree(&remote, &branch_name, &target, request.from_remote) {
            Ok(()) => {
                rollback.discard();
                Ok(target)
            }
            Err(e) => {
                rollback.push(UndoAction::Directory(target));
                rollback.unwind(self.store, self.fs, self.git);
                Err(e)
            }
        }
    }

    /// Branch preparation, directory creation, and the git worktree command.
    fn materialize_worktree(
        &mut self,
        remote: &str,
        branch_name: &str,
        target: &Path,
        from_remote: bool,
    ) -> Result<()> {
        if !self.git.branch_exists(&self.root, branch_name)? {
            let start = from_remote.then(|| format!("{remote}/{branch_name}"));
            self.git
                .create_branch(&self.root, branch_name, start.as_deref())?;
        }
        if let Some(parent) = target.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.git.create_worktree(&self.root, target, branch_name)
    }

    /// Fetch a branch from a remote (possibly a fork derived from origin)
    /// and create its worktree.
    pub fn load_worktree(&mut self, remote_source: &str, branch_name: &str) -> Result<PathBuf> {
        let branch_name = branch::sanitize(branch_name)?;
        let source = if remote_source.trim().is_empty() {
            DEFAULT_REMOTE.to_string()
        } else {
            remote_source.trim().to_string()
        };

        if !self.is_git_repository() {
            return Err(Error::GitRepositoryNotFound {
                path: self.root.clone(),
            });
        }
        let origin = self.origin_url()?;

        let mut rollback = Rollback::new();
        if source != DEFAULT_REMOTE && !self.git.remote_exists(&self.root, &source)? {
            let derived = origin.with_owner(&source).to_url_string();
            self.git.add_remote(&self.root, &source, &derived)?;
            rollback.push(UndoAction::Remote {
                repo: self.root.clone(),
                name: source.clone(),
            });
        }

        let fetched = self
            .git
            .fetch_remote(&self.root, &source)
            .and_then(|()| {
                self.git
                    .branch_exists_on_remote(&self.root, &source, &branch_name)
            })
            .and_then(|exists| {
                if exists {
                    Ok(())
                } else {
                    Err(Error::BranchNotFoundOnRemote {
                        remote: source.clone(),
                        branch: branch_name.clone(),
                    })
                }
            });
        if let Err(e) = fetched {
            rollback.unwind(self.store, self.fs, self.git);
            return Err(e);
        }

        let result = self.create_worktree(CreateWorktree {
            branch: branch_name,
            remote: Some(source),
            from_remote: true,
            ..Default::default()
        });
        match result {
            Ok(path) => {
                rollback.discard();
                Ok(path)
            }
            Err(e) => {
                rollback.unwind(self.store, self.fs, self.git);
                Err(e)
            }
        }
    }

    /// Delete the worktree(s) for a branch: git worktree removal, directory
    /// removal, then the status entry.
    pub fn delete_worktree(&mut self, branch_name: &str, force: bool) -> Result<()> {
        let branch_name = branch::sanitize(branch_name)?;
        let repo_id = self.canonical_id()?;
        let root = self.root.clone();
        self.delete_worktree_in(&repo_id, &root, &branch_name, force, !force)
    }

    /// Deletion against a known repository entry; used by both the
    /// single-repo flow and the workspace fan-out (which confirms once for
    /// the whole group).
    pub fn delete_worktree_in(
        &mut self,
        repo_id: &str,
        repo_root: &Path,
        branch_name: &str,
        force: bool,
        confirm: bool,
    ) -> Result<()> {
        let infos = self.store.worktrees_for_branch(repo_id, branch_name);
        if infos.is_empty() {
            return Err(Error::WorktreeNotInStatus {
                branch: branch_name.to_string(),
            });
        }

        if confirm {
            let accepted = prompt_for_confirmation(
                self.prompt,
                &format!("Delete worktree '{branch_name}' of {repo_id}?"),
                false,
            )?;
            if !accepted {
                return Err(Error::DeletionCancelled);
            }
        }

        for info in &infos {
            let path = self
                .paths
                .worktree_path(repo_id, &info.remote, branch_name)?;
            if let Err(e) = self.git.remove_worktree(repo_root, &path, force) {
                if !force {
                    return Err(e);
                }
                log::warn!("git worktree removal for {} failed: {e}", path.display());
            }
            if let Err(e) = self.fs.remove_all(&path) {
                if !force {
                    return Err(e);
                }
                log::warn!("removing {} failed: {e}", path.display());
            }
        }

        self.store.remove_worktree(repo_id, branch_name)
    }

    /// Delete every tracked worktree of this repository.
    pub fn delete_all_worktrees(&mut self, force: bool) -> Result<()> {
        let repo_id = self.canonical_id()?;
        let branches: Vec<String> = self
            .list_worktrees()?
            .into_iter()
            .map(|info| info.branch)
            .collect();
        if branches.is_empty() {
            return Ok(());
        }

        if !force {
            let accepted = prompt_for_confirmation(
                self.prompt,
                &format!(
                    "Delete {} worktree(s) of {repo_id} ({})?",
                    branches.len(),
                    branches.join(", ")
                ),
                false,
            )?;
            if !accepted {
                return Err(Error::DeletionCancelled);
            }
        }

        let root = self.root.clone();
        let mut seen = std::collections::BTreeSet::new();
        for branch_name in branches {
            if !seen.insert(branch_name.clone()) {
                continue;
            }
            self.delete_worktree_in(&repo_id, &root, &branch_name, force, false)?;
        }
        Ok(())
    }

    /// Tracked worktrees of this repository, sorted by `(remote, branch)`.
    pub fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>> {
        let repo_id = self.canonical_id()?;
        let mut infos: Vec<WorktreeInfo> = self
            .store
            .get_repository(&repo_id)
            .map(|repo| repo.worktrees.values().cloned().collect())
            .unwrap_or_default();
        infos.sort_by(|a, b| (&a.remote, &a.branch).cmp(&(&b.remote, &b.branch)));
        Ok(infos)
    }

    /// Clone a repository into the managed layout and track it.
    ///
    /// The primary clone lands at the default branch's worktree slot
    /// (`<repositories_dir>/<id>/origin/<default branch>`), so further
    /// worktrees become its siblings.
    pub fn clone_repository(&mut self, url: &str) -> Result<PathBuf> {
        let parsed = GitUrl::parse(url)?;
        let repo_id = parsed.canonical_id();
        if self.store.get_repository(&repo_id).is_some() {
            return Err(Error::RepositoryAlreadyExists { name: repo_id });
        }

        let default_branch = self.git.remote_default_branch(url)?;
        let target = self
            .paths
            .worktree_path(&repo_id, DEFAULT_REMOTE, &default_branch)?;
        if self.fs.exists(&target) {
            return Err(Error::DirectoryExists { path: target });
        }
        if let Some(parent) = target.parent() {
            self.fs.create_dir_all(parent)?;
        }

        self.git.clone(url, &target)?;

        let mut rollback = Rollback::new();
        rollback.push(UndoAction::Directory(target.clone()));
        let registered = self
            .store
            .add_repository(&repo_id, &target)
            .and_then(|()| {
                self.store
                    .add_worktree(&repo_id, WorktreeInfo::new(DEFAULT_REMOTE, default_branch.as_str()))
            });
        match registered {
            Ok(()) => {
                rollback.discard();
                Ok(target)
            }
            Err(e) => {
                rollback.unwind(self.store, self.fs, self.git);
                Err(e)
            }
        }
    }
}
