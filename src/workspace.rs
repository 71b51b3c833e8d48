//! Workspace operations: grouped worktree materialization across member
//! repositories.
//!
//! Fan-out is sequential and transactional at the group scope: reservations
//! for every member first, then the manifest, then directories and git
//! commands member by member. Any failure unwinds everything committed so
//! far in reverse order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::branch;
use crate::error::{Error, Result};
use crate::fs::Filesystem;
use crate::git::Git;
use crate::paths::PathBuilder;
use crate::prompt::{Prompt, prompt_for_confirmation};
use crate::repository::{DEFAULT_REMOTE, RepositoryDriver};
use crate::rollback::{Rollback, UndoAction};
use crate::status::{StatusStore, Workspace, WorktreeInfo};

/// One folder entry of a `.code-workspace` manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
    /// Fields grove does not interpret are kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A `.code-workspace` manifest. grove reads and writes `name` and
/// `folders`; `settings`, `extensions` and anything else pass through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub folders: Vec<WorkspaceFolder>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkspaceFile {
    pub fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| Error::InvalidInput {
            reason: format!("malformed workspace file: {e}"),
        })
    }

    pub fn to_json(&self) -> String {
        // Serialization of this shape cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// One row of a workspace worktree listing: a branch and the members that
/// materialize it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceWorktreeRow {
    pub branch: String,
    pub repositories: Vec<String>,
}

pub struct WorkspaceDriver<'a> {
    fs: &'a dyn Filesystem,
    git: &'a dyn Git,
    prompt: &'a dyn Prompt,
    paths: &'a PathBuilder,
    store: &'a mut StatusStore,
}

impl<'a> WorkspaceDriver<'a> {
    pub fn new(
        fs: &'a dyn Filesystem,
        git: &'a dyn Git,
        prompt: &'a dyn Prompt,
        paths: &'a PathBuilder,
        store: &'a mut StatusStore,
    ) -> Self {
        Self {
            fs,
            git,
            prompt,
            paths,
            store,
        }
    }

    fn workspace(&self, name: &str) -> Result<Workspace> {
        self.store
            .get_workspace(name)
            .cloned()
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })
    }

    /// Member ids with the primary clone path of each.
    fn members(&self, workspace: &Workspace) -> Result<Vec<(String, PathBuf)>> {
        workspace
            .repositories
            .iter()
            .map(|id| {
                self.store
                    .get_repository(id)
                    .map(|repo| (id.clone(), repo.path.clone()))
                    .ok_or_else(|| Error::RepositoryNotFound { name: id.clone() })
            })
            .collect()
    }

    /// Create a workspace from tracked repositories and write its manifest.
    pub fn create_workspace(&mut self, name: &str, repo_ids: Vec<String>) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput {
                reason: "workspace name is empty".to_string(),
            });
        }
        if name.contains(['/', '\\', ':']) {
            return Err(Error::InvalidInput {
                reason: format!("workspace name '{name}' must not contain path separators"),
            });
        }
        if repo_ids.is_empty() {
            return Err(Error::InvalidInput {
                reason: "a workspace needs at least one repository".to_string(),
            });
        }

        // Members must be tracked and their clones present on disk.
        for id in &repo_ids {
            let repo = self
                .store
                .get_repository(id)
                .ok_or_else(|| Error::RepositoryNotFound { name: id.clone() })?;
            self.fs.validate_repository_path(&repo.path)?;
        }

        self.store.add_workspace(name, repo_ids.clone())?;

        let manifest = WorkspaceFile {
            name: Some(name.to_string()),
            folders: repo_ids
                .iter()
                .map(|id| {
                    let path = self
                        .store
                        .get_repository(id)
                        .map(|repo| repo.path.display().to_string())
                        .unwrap_or_default();
                    WorkspaceFolder {
                        name: Some(short_name(id)),
                        path,
                        extra: serde_json::Map::new(),
                    }
                })
                .collect(),
            extra: serde_json::Map::new(),
        };

        let file_path = self.paths.workspace_file_path(name);
        if let Err(e) = self.fs.write_file_atomic(&file_path, &manifest.to_json()) {
            // Keep the store consistent with the filesystem.
            if let Err(cleanup) = self.store.remove_workspace(name) {
                log::warn!("could not roll back workspace '{name}': {cleanup}");
            }
            return Err(e);
        }
        Ok(file_path)
    }

    /// Materialize a branch across every member repository. Returns the
    /// per-worktree workspace file path.
    pub fn create_worktree(&mut self, name: &str, branch_name: &str, force: bool) -> Result<PathBuf> {
        let branch_name = branch::sanitize(branch_name)?;
        let workspace = self.workspace(name)?;
        let members = self.members(&workspace)?;

        // Pre-validation across the whole group before any side effect.
        for (id, repo_path) in &members {
            if !self.git.is_git_repository(repo_path) {
                return Err(Error::GitRepositoryNotFound {
                    path: repo_path.clone(),
                });
            }
            if self.store.get_worktree(id, &branch_name).is_some() {
                return Err(Error::WorktreeExists {
                    remote: DEFAULT_REMOTE.to_string(),
                    branch: branch_name.clone(),
                });
            }
            let target = self.paths.worktree_path(id, DEFAULT_REMOTE, &branch_name)?;
            if self.fs.exists(&target) {
                return Err(Error::DirectoryExists { path: target });
            }
            if !force && !self.git.is_clean(repo_path)? {
                return Err(Error::RepositoryNotClean {
                    path: repo_path.clone(),
                });
            }
        }

        let file_path = self.paths.worktree_workspace_file_path(name, &branch_name)?;
        let mut rollback = Rollback::new();

        let outcome = self.materialize_group(&members, name, &branch_name, &file_path, &mut rollback);
        match outcome {
            Ok(()) => {
                rollback.discard();
                Ok(file_path)
            }
            Err(e) => {
                rollback.unwind(self.store, self.fs, self.git);
                Err(e)
            }
        }
    }

    fn materialize_group(
        &mut self,
        members: &[(String, PathBuf)],
        name: &str,
        branch_name: &str,
        file_path: &Path,
        rollback: &mut Rollback,
    ) -> Result<()> {
        // 1. Reserve status entries for every member.
        for (id, _) in members {
            let mut info = WorktreeInfo::new(DEFAULT_REMOTE, branch_name);
            info.workspace = Some(file_path.to_path_buf());
            self.store.add_worktree(id, info)?;
            rollback.push(UndoAction::WorktreeEntry {
                repo_id: id.clone(),
                branch: branch_name.to_string(),
            });
        }

        // 2. Per-worktree manifest pointing at the to-be-created paths.
        let mut folders = Vec::new();
        for (id, _) in members {
            let target = self.paths.worktree_path(id, DEFAULT_REMOTE, branch_name)?;
            folders.push(WorkspaceFolder {
                name: Some(short_name(id)),
                path: target.display().to_string(),
                extra: serde_json::Map::new(),
            });
        }
        let manifest = WorkspaceFile {
            name: Some(format!("{name} ({branch_name})")),
            folders,
            extra: serde_json::Map::new(),
        };
        self.fs.write_file_atomic(file_path, &manifest.to_json())?;
        rollback.push(UndoAction::File(file_path.to_path_buf()));

        // 3. Branches, directories, git worktrees, member by member.
        for (id, repo_path) in members {
            let target = self.paths.worktree_path(id, DEFAULT_REMOTE, branch_name)?;
            if !self.git.branch_exists(repo_path, branch_name)? {
                self.git.create_branch(repo_path, branch_name, None)?;
            }
            if let Some(parent) = target.parent() {
                self.fs.create_dir_all(parent)?;
            }
            rollback.push(UndoAction::Directory(target.clone()));
            self.git.create_worktree(repo_path, &target, branch_name)?;
        }

        // 4. Record the branch on the workspace entry.
        let mut updated = self.workspace(name)?;
        if !updated.worktrees.iter().any(|b| b == branch_name) {
            updated.worktrees.push(branch_name.to_string());
        }
        self.store.update_workspace(name, updated)
    }

    /// Delete a branch's worktrees across every member.
    pub fn delete_worktree(&mut self, name: &str, branch_name: &str, force: bool) -> Result<()> {
        let branch_name = branch::sanitize(branch_name)?;
        let workspace = self.workspace(name)?;
        let members = self.members(&workspace)?;

        let affected: Vec<&(String, PathBuf)> = members
            .iter()
            .filter(|(id, _)| self.store.get_worktree(id, &branch_name).is_some())
            .collect();
        if affected.is_empty() {
            return Err(Error::WorktreeNotInStatus {
                branch: branch_name.clone(),
            });
        }

        if !force {
            let repos: Vec<&str> = affected.iter().map(|(id, _)| id.as_str()).collect();
            let accepted = prompt_for_confirmation(
                self.prompt,
                &format!(
                    "Delete worktree '{branch_name}' across {} ({})?",
                    name,
                    repos.join(", ")
                ),
                false,
            )?;
            if !accepted {
                return Err(Error::DeletionCancelled);
            }
        }

        for (id, repo_path) in &members {
            if self.store.get_worktree(id, &branch_name).is_none() {
                continue;
            }
            let mut driver = RepositoryDriver::new(
                self.fs,
                self.git,
                self.prompt,
                self.paths,
                self.store,
                repo_path.clone(),
            );
            driver.delete_worktree_in(id, repo_path, &branch_name, force, false)?;
        }

        let file_path = self.paths.worktree_workspace_file_path(name, &branch_name)?;
        if let Err(e) = self.fs.remove_all(&file_path) {
            if !force {
                return Err(e);
            }
            log::warn!("removing {} failed: {e}", file_path.display());
        }

        let mut updated = self.workspace(name)?;
        updated.worktrees.retain(|b| b != &branch_name);
        self.store.update_workspace(name, updated)
    }

    /// Delete a workspace: its materialized worktrees, its manifest files,
    /// and its status entry.
    pub fn delete_workspace(&mut self, name: &str, force: bool) -> Result<()> {
        let workspace = self.workspace(name)?;
        let members = self.members(&workspace)?;

        // Materialized branches, with the members that carry them.
        let mut rows: Vec<WorkspaceWorktreeRow> = Vec::new();
        for branch_name in &workspace.worktrees {
            let repositories: Vec<String> = members
                .iter()
                .filter(|(id, _)| self.store.get_worktree(id, branch_name).is_some())
                .map(|(id, _)| id.clone())
                .collect();
            if !repositories.is_empty() {
                rows.push(WorkspaceWorktreeRow {
                    branch: branch_name.clone(),
                    repositories,
                });
            }
        }

        if !force {
            let mut summary = format!("Delete workspace '{name}'?\n");
            for row in &rows {
                summary.push_str(&format!(
                    "  {} ({})\n",
                    row.branch,
                    row.repositories.join(", ")
                ));
            }
            summary.push_str(&format!(
                "  {}\n",
                self.paths.workspace_file_path(name).display()
            ));
            let accepted = prompt_for_confirmation(self.prompt, summary.trim_end(), false)?;
            if !accepted {
                return Err(Error::DeletionCancelled);
            }
        }

        // Worktrees first, then manifests, then the entry itself.
        for row in &rows {
            for (id, repo_path) in &members {
                if self.store.get_worktree(id, &row.branch).is_none() {
                    continue;
                }
                let mut driver = RepositoryDriver::new(
                    self.fs,
                    self.git,
                    self.prompt,
                    self.paths,
                    self.store,
                    repo_path.clone(),
                );
                driver.delete_worktree_in(id, repo_path, &row.branch, force, false)?;
            }
            let file_path = self.paths.worktree_workspace_file_path(name, &row.branch)?;
            if let Err(e) = self.fs.remove_all(&file_path) {
                if !force {
                    return Err(e);
                }
                log::warn!("removing {} failed: {e}", file_path.display());
            }
        }

        let main_file = self.paths.workspace_file_path(name);
        if let Err(e) = self.fs.remove_all(&main_file) {
            if !force {
                return Err(e);
            }
            log::warn!("removing {} failed: {e}", main_file.display());
        }

        let mut updated = self.workspace(name)?;
        updated.worktrees.clear();
        self.store.update_workspace(name, updated)?;
        self.store.remove_workspace(name)
    }

    /// Branches materialized in the workspace, with their members.
    pub fn list_worktrees(&self, name: &str) -> Result<Vec<WorkspaceWorktreeRow>> {
        let workspace = self.workspace(name)?;
        let members = self.members(&workspace)?;
        let mut rows = Vec::new();
        for branch_name in &workspace.worktrees {
            let repositories: Vec<String> = members
                .iter()
                .filter(|(id, _)| self.store.get_worktree(id, branch_name).is_some())
                .map(|(id, _)| id.clone())
                .collect();
            rows.push(WorkspaceWorktreeRow {
                branch: branch_name.clone(),
                repositories,
            });
        }
        rows.sort_by(|a, b| a.branch.cmp(&b.branch));
        Ok(rows)
    }

    /// Path of the per-worktree workspace file for a materialized branch.
    pub fn open_worktree(&self, name: &str, branch_name: &str) -> Result<PathBuf> {
        let branch_name = branch::sanitize(branch_name)?;
        let workspace = self.workspace(name)?;
        if !workspace.worktrees.iter().any(|b| b == &branch_name) {
            return Err(Error::WorktreeNotInStatus {
                branch: branch_name,
            });
        }
        self.paths.worktree_workspace_file_path(name, &branch_name)
    }
}

/// Last segment of a canonical repository id, for folder labels.
fn short_name(repo_id: &str) -> String {
    repo_id
        .rsplit('/')
        .next()
        .unwrap_or(repo_id)
        .to_string()
}
