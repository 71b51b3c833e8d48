//! Explicit undo lists for multi-step operations.
//!
//! Each driver operation records the side effects it has committed (status
//! entries, files, directories, added remotes) and unwinds them in reverse
//! order when a later step fails. Unwind failures are downgraded to
//! warnings; the original error is what surfaces.

use std::path::PathBuf;

use crate::fs::Filesystem;
use crate::git::Git;
use crate::status::StatusStore;

#[derive(Debug)]
pub enum UndoAction {
    /// Remove a reserved worktree entry from the status store.
    WorktreeEntry { repo_id: String, branch: String },
    /// Remove a created directory tree.
    Directory(PathBuf),
    /// Remove a written file.
    File(PathBuf),
    /// Remove a remote added to a repository.
    Remote { repo: PathBuf, name: String },
}

#[derive(Debug, Default)]
pub struct Rollback {
    actions: Vec<UndoAction>,
}

impl Rollback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: UndoAction) {
        self.actions.push(action);
    }

    /// Walk the recorded actions in reverse, best-effort.
    pub fn unwind(self, store: &mut StatusStore, fs: &dyn Filesystem, git: &dyn Git) {
        for action in self.actions.into_iter().rev() {
            let outcome = match &action {
                UndoAction::WorktreeEntry { repo_id, branch } => {
                    store.remove_worktree(repo_id, branch)
                }
                UndoAction::Directory(path) | UndoAction::File(path) => fs.remove_all(path),
                UndoAction::Remote { repo, name } => git.remove_remote(repo, name),
            };
            if let Err(e) = outcome {
                log::warn!("rollback step {action:?} failed: {e}");
            }
        }
    }

    /// Forget the recorded actions; the operation committed.
    pub fn discard(mut self) {
        self.actions.clear();
    }
}
