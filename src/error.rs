//! Error taxonomy and exit-code mapping.
//!
//! Every fallible operation in grove returns [`Error`]. Drivers construct the
//! variant that names the failure; the binary maps it onto an exit code with
//! [`Error::exit_code`].

use std::io;
use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Configuration or status file is missing; `grove init` has not run.
    NotInitialized,
    /// `grove init` was run but configuration already exists.
    AlreadyInitialized,
    /// Invalid user input (empty names, conflicting selectors, bad choices).
    InvalidInput { reason: String },
    /// Branch name failed sanitization.
    InvalidBranch { branch: String, reason: String },
    /// Git URL is neither an HTTPS nor an SSH remote URL.
    UnsupportedUrl { url: String },
    /// The path is not inside a git repository.
    GitRepositoryNotFound { path: PathBuf },
    /// Working tree has uncommitted changes.
    RepositoryNotClean { path: PathBuf },
    /// Target worktree directory already exists on disk.
    DirectoryExists { path: PathBuf },
    /// A worktree for this remote/branch is already tracked.
    WorktreeExists { remote: String, branch: String },
    /// No tracked worktree matches this branch.
    WorktreeNotInStatus { branch: String },
    RepositoryNotFound { name: String },
    RepositoryAlreadyExists { name: String },
    /// A repository with this canonical id is tracked under a different path.
    DuplicateRepository { id: String },
    WorkspaceNotFound { name: String },
    WorkspaceAlreadyExists { name: String },
    /// Operation is defined for single-repository mode only.
    WorkspaceModeNotSupported { operation: String },
    /// The repository has no `origin` remote.
    OriginRemoteNotFound,
    /// The `origin` remote URL could not be normalized.
    OriginRemoteInvalidUrl { url: String },
    BranchNotFoundOnRemote { remote: String, branch: String },
    FetchFailed { remote: String, output: String },
    CloneFailed { url: String, output: String },
    /// The user declined a deletion confirmation.
    DeletionCancelled,
    /// The user cancelled a prompt (`q`/`quit`/`exit`/`cancel`), or the
    /// prompt retry budget was exhausted.
    UserCancelled,
    InvalidIssueRef { reference: String },
    /// A bare issue number needs a repository context to resolve.
    IssueNumberRequiresContext { reference: String },
    /// The persisted status document does not parse against the schema.
    SchemaMismatch { location: String, detail: String },
    Io(io::Error),
    /// A git subprocess exited non-zero.
    Git { command: String, output: String },
    /// An operation body panicked inside the hook pipeline.
    PanicInOperation { operation: String },
}

impl Error {
    /// Exit code for the CLI: 1 user error, 2 runtime error, 3 not initialized.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotInitialized => 3,
            Error::AlreadyInitialized
            | Error::InvalidInput { .. }
            | Error::InvalidBranch { .. }
            | Error::UnsupportedUrl { .. }
            | Error::GitRepositoryNotFound { .. }
            | Error::RepositoryNotClean { .. }
            | Error::DirectoryExists { .. }
            | Error::WorktreeExists { .. }
            | Error::WorktreeNotInStatus { .. }
            | Error::RepositoryNotFound { .. }
            | Error::RepositoryAlreadyExists { .. }
            | Error::DuplicateRepository { .. }
            | Error::WorkspaceNotFound { .. }
            | Error::WorkspaceAlreadyExists { .. }
            | Error::WorkspaceModeNotSupported { .. }
            | Error::BranchNotFoundOnRemote { .. }
            | Error::DeletionCancelled
            | Error::UserCancelled
            | Error::InvalidIssueRef { .. }
            | Error::IssueNumberRequiresContext { .. } => 1,
            Error::OriginRemoteNotFound
            | Error::OriginRemoteInvalidUrl { .. }
            | Error::FetchFailed { .. }
            | Error::CloneFailed { .. }
            | Error::SchemaMismatch { .. }
            | Error::Io(_)
            | Error::Git { .. }
            | Error::PanicInOperation { .. } => 2,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotInitialized => {
                write!(f, "grove is not initialized; run 'grove init' first")
            }
            Error::AlreadyInitialized => {
                write!(
                    f,
                    "grove is already initialized; use 'grove init --reset' to start over"
                )
            }
            Error::InvalidInput { reason } => write!(f, "invalid input: {reason}"),
            Error::InvalidBranch { branch, reason } => {
                write!(f, "invalid branch name '{branch}': {reason}")
            }
            Error::UnsupportedUrl { url } => {
                write!(f, "unsupported git URL '{url}' (expected HTTPS or SSH form)")
            }
            Error::GitRepositoryNotFound { path } => {
                write!(f, "no git repository found at {}", path.display())
            }
            Error::RepositoryNotClean { path } => {
                write!(
                    f,
                    "repository at {} has uncommitted changes (use --force to override)",
                    path.display()
                )
            }
            Error::DirectoryExists { path } => {
                write!(f, "directory already exists: {}", path.display())
            }
            Error::WorktreeExists { remote, branch } => {
                write!(f, "worktree for {remote}:{branch} already exists")
            }
            Error::WorktreeNotInStatus { branch } => {
                write!(f, "no tracked worktree for branch '{branch}'")
            }
            Error::RepositoryNotFound { name } => write!(f, "repository '{name}' not found"),
            Error::RepositoryAlreadyExists { name } => {
                write!(f, "repository '{name}' already exists")
            }
            Error::DuplicateRepository { id } => {
                write!(f, "repository '{id}' is already tracked under a different path")
            }
            Error::WorkspaceNotFound { name } => write!(f, "workspace '{name}' not found"),
            Error::WorkspaceAlreadyExists { name } => {
                write!(f, "workspace '{name}' already exists")
            }
            Error::WorkspaceModeNotSupported { operation } => {
                write!(f, "'{operation}' is not supported in workspace mode")
            }
            Error::OriginRemoteNotFound => write!(f, "repository has no 'origin' remote"),
            Error::OriginRemoteInvalidUrl { url } => {
                write!(f, "origin remote URL '{url}' is not a recognized git URL")
            }
            Error::BranchNotFoundOnRemote { remote, branch } => {
                write!(f, "branch '{branch}' not found on remote '{remote}'")
            }
            Error::FetchFailed { remote, output } => {
                write!(f, "fetching from '{remote}' failed: {output}")
            }
            Error::CloneFailed { url, output } => write!(f, "cloning '{url}' failed: {output}"),
            Error::DeletionCancelled => write!(f, "deletion cancelled"),
            Error::UserCancelled => write!(f, "cancelled"),
            Error::InvalidIssueRef { reference } => {
                write!(f, "'{reference}' is not a recognized issue reference")
            }
            Error::IssueNumberRequiresContext { reference } => {
                write!(
                    f,
                    "issue number '{reference}' needs a repository context; run inside a repository or use owner/repo#number"
                )
            }
            Error::SchemaMismatch { location, detail } => {
                write!(
                    f,
                    "status document at {location} does not match the schema: {detail}"
                )
            }
            Error::Io(e) => write!(f, "{e}"),
            Error::Git { command, output } => {
                if output.is_empty() {
                    write!(f, "{command} failed")
                } else {
                    write!(f, "{command} failed: {output}")
                }
            }
            Error::PanicInOperation { operation } => {
                write!(f, "operation '{operation}' aborted unexpectedly")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
