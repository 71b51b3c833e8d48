//! The status store: grove's persistent index of repositories, workspaces,
//! and worktrees.
//!
//! The store exclusively owns the in-memory document. Every mutating
//! operation is a transaction: the mutation is applied to the document and
//! committed to the backend; if either step fails the previous document is
//! restored, so the persisted file never reflects a partial operation.

use std::path::Path;

use crate::error::{Error, Result};

mod backend;
mod document;

pub use backend::{FileBackend, MemoryBackend, StatusBackend};
pub use document::{
    Repository, SCHEMA_VERSION, StatusDocument, Workspace, WorktreeInfo, worktree_key,
};

pub struct StatusStore {
    backend: Box<dyn StatusBackend>,
    doc: StatusDocument,
}

impl StatusStore {
    /// Load the persisted document, or start empty when none exists.
    pub fn open(backend: Box<dyn StatusBackend>) -> Result<Self> {
        let doc = match backend.load()? {
            None => StatusDocument::default(),
            Some(contents) => {
                let doc: StatusDocument =
                    serde_json::from_str(&contents).map_err(|e| Error::SchemaMismatch {
                        location: backend.location(),
                        detail: e.to_string(),
                    })?;
                if doc.version != SCHEMA_VERSION {
                    return Err(Error::SchemaMismatch {
                        location: backend.location(),
                        detail: format!(
                            "unsupported schema version {} (expected {SCHEMA_VERSION})",
                            doc.version
                        ),
                    });
                }
                doc
            }
        };
        Ok(Self { backend, doc })
    }

    /// Reinitialize to an empty document and persist it.
    pub fn reset(&mut self) -> Result<()> {
        self.transact(|doc| {
            *doc = StatusDocument::default();
            Ok(())
        })
    }

    /// Persist the current document without mutating it. Used by init to
    /// materialize the empty file.
    pub fn persist(&mut self) -> Result<()> {
        self.transact(|_| Ok(()))
    }

    fn transact<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut StatusDocument) -> Result<()>,
    {
        let backup = self.doc.clone();
        if let Err(e) = mutate(&mut self.doc) {
            self.doc = backup;
            return Err(e);
        }
        let serialized = match serde_json::to_string_pretty(&self.doc) {
            Ok(s) => s,
            Err(e) => {
                self.doc = backup;
                return Err(Error::Io(std::io::Error::other(format!(
                    "could not serialize status document: {e}"
                ))));
            }
        };
        if let Err(e) = self.backend.save(&serialized) {
            self.doc = backup;
            return Err(e);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Repositories
    // ------------------------------------------------------------------

    /// Track a repository. Idempotent when the path matches the existing
    /// entry; a different path for the same id is a conflict.
    pub fn add_repository(&mut self, id: &str, path: &Path) -> Result<()> {
        self.transact(|doc| {
            if let Some(existing) = doc.repositories.get(id) {
                if existing.path == path {
                    return Ok(());
                }
                return Err(Error::DuplicateRepository { id: id.to_string() });
            }
            doc.repositories
                .insert(id.to_string(), Repository::new(path));
            Ok(())
        })
    }

    /// Untrack a repository. Refused while any workspace lists it.
    pub fn remove_repository(&mut self, id: &str) -> Result<()> {
        self.transact(|doc| {
            if !doc.repositories.contains_key(id) {
                return Err(Error::RepositoryNotFound {
                    name: id.to_string(),
                });
            }
            if let Some((name, _)) = doc
                .workspaces
                .iter()
                .find(|(_, ws)| ws.repositories.iter().any(|r| r == id))
            {
                return Err(Error::InvalidInput {
                    reason: format!("repository '{id}' is a member of workspace '{name}'"),
                });
            }
            doc.repositories.shift_remove(id);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Worktrees
    // ------------------------------------------------------------------

    pub fn add_worktree(&mut self, id: &str, info: WorktreeInfo) -> Result<()> {
        self.transact(|doc| {
            let repo = doc
                .repositories
                .get_mut(id)
                .ok_or_else(|| Error::RepositoryNotFound {
                    name: id.to_string(),
                })?;
            let key = info.key();
            if repo.worktrees.contains_key(&key) {
                return Err(Error::WorktreeExists {
                    remote: info.remote,
                    branch: info.branch,
                });
            }
            repo.worktrees.insert(key, info);
            Ok(())
        })
    }

    /// Remove every worktree entry of the repository whose branch matches.
    pub fn remove_worktree(&mut self, id: &str, branch: &str) -> Result<()> {
        self.transact(|doc| {
            let repo = doc
                .repositories
                .get_mut(id)
                .ok_or_else(|| Error::RepositoryNotFound {
                    name: id.to_string(),
                })?;
            let before = repo.worktrees.len();
            repo.worktrees.retain(|_, info| info.branch != branch);
            if repo.worktrees.len() == before {
                return Err(Error::WorktreeNotInStatus {
                    branch: branch.to_string(),
                });
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Workspaces
    // ------------------------------------------------------------------

    pub fn add_workspace(&mut self, name: &str, repositories: Vec<String>) -> Result<()> {
        self.transact(|doc| {
            if doc.workspaces.contains_key(name) {
                return Err(Error::WorkspaceAlreadyExists {
                    name: name.to_string(),
                });
            }
            for id in &repositories {
                if !doc.repositories.contains_key(id) {
                    return Err(Error::RepositoryNotFound { name: id.clone() });
                }
            }
            doc.workspaces.insert(
                name.to_string(),
                Workspace {
                    repositories,
                    worktrees: Vec::new(),
                },
            );
            Ok(())
        })
    }

    pub fn update_workspace(&mut self, name: &str, workspace: Workspace) -> Result<()> {
        self.transact(|doc| {
            let entry = doc
                .workspaces
                .get_mut(name)
                .ok_or_else(|| Error::WorkspaceNotFound {
                    name: name.to_string(),
                })?;
            *entry = workspace;
            Ok(())
        })
    }

    pub fn remove_workspace(&mut self, name: &str) -> Result<()> {
        self.transact(|doc| {
            if doc.workspaces.shift_remove(name).is_none() {
                return Err(Error::WorkspaceNotFound {
                    name: name.to_string(),
                });
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Queries (read-only snapshots)
    // ------------------------------------------------------------------

    /// All worktrees across all repositories, sorted by repository id then
    /// worktree key.
    pub fn list_all_worktrees(&self) -> Vec<(String, WorktreeInfo)> {
        let mut out: Vec<(String, WorktreeInfo)> = self
            .doc
            .repositories
            .iter()
            .flat_map(|(id, repo)| {
                repo.worktrees
                    .values()
                    .map(move |info| (id.clone(), info.clone()))
            })
            .collect();
        out.sort_by(|a, b| (a.0.as_str(), a.1.key()).cmp(&(b.0.as_str(), b.1.key())));
        out
    }

    pub fn get_repository(&self, id: &str) -> Option<&Repository> {
        self.doc.repositories.get(id)
    }

    pub fn get_workspace(&self, name: &str) -> Option<&Workspace> {
        self.doc.workspaces.get(name)
    }

    /// The first worktree of the repository whose branch matches, regardless
    /// of remote.
    pub fn get_worktree(&self, id: &str, branch: &str) -> Option<&WorktreeInfo> {
        self.doc
            .repositories
            .get(id)?
            .worktrees
            .values()
            .find(|info| info.branch == branch)
    }

    /// Every worktree of the repository whose branch matches.
    pub fn worktrees_for_branch(&self, id: &str, branch: &str) -> Vec<WorktreeInfo> {
        self.doc
            .repositories
            .get(id)
            .map(|repo| {
                repo.worktrees
                    .values()
                    .filter(|info| info.branch == branch)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Read-only view of the whole document.
    pub fn snapshot(&self) -> &StatusDocument {
        &self.doc
    }
}
