//! Command-line surface. Verbs map 1:1 onto orchestrator entry points.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "grove",
    version,
    about = "Manage git worktrees across repositories and multi-repo workspaces"
)]
pub struct Cli {
    /// Log subprocess invocations and debug details
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress prompts and use defaults
    #[arg(long, global = true)]
    pub non_interactive: bool,

    /// Use an alternative configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::Args, Default)]
pub struct SelectorArgs {
    /// Operate on a named workspace
    #[arg(long, value_name = "NAME")]
    pub workspace: Option<String>,

    /// Operate on a tracked repository (canonical id)
    #[arg(long, value_name = "ID")]
    pub repository: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize configuration and the status document
    Init {
        /// Base path for repositories and workspaces
        #[arg(long, value_name = "PATH")]
        base_path: Option<String>,

        /// Reinitialize the status document to empty
        #[arg(long)]
        reset: bool,

        /// Skip the reset confirmation
        #[arg(long)]
        force: bool,
    },

    /// Clone a repository into the managed layout and track it
    Clone {
        /// HTTPS or SSH git URL
        url: String,
    },

    /// Create a worktree for a branch
    Create {
        /// Branch name (optional with --issue)
        branch: Option<String>,

        /// Skip the clean working tree check
        #[arg(long)]
        force: bool,

        /// Remote the branch belongs to (default: origin)
        #[arg(long, value_name = "NAME")]
        remote: Option<String>,

        /// Derive the branch from a forge issue (number, owner/repo#n, or URL)
        #[arg(long, value_name = "REF")]
        issue: Option<String>,

        /// Open the result in this IDE
        #[arg(long, value_name = "NAME")]
        ide: Option<String>,

        #[command(flatten)]
        selectors: SelectorArgs,
    },

    /// Fetch a branch from a remote source and create its worktree
    Load {
        /// Branch to load, optionally prefixed with a remote source
        /// (`otheruser:feature-y`)
        source: String,

        /// Open the result in this IDE
        #[arg(long, value_name = "NAME")]
        ide: Option<String>,

        #[command(flatten)]
        selectors: SelectorArgs,
    },

    /// Delete a worktree (or all of them)
    Delete {
        /// Branch whose worktree to delete
        #[arg(required_unless_present = "all")]
        branch: Option<String>,

        /// Delete every worktree of the repository
        #[arg(long, conflicts_with = "branch")]
        all: bool,

        /// Skip confirmation; keep going on errors
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        selectors: SelectorArgs,
    },

    /// List worktrees for the current context
    List {
        #[command(flatten)]
        selectors: SelectorArgs,
    },

    /// Print the path of a worktree (and open it with --ide)
    Open {
        branch: String,

        /// Open in this IDE
        #[arg(long, value_name = "NAME")]
        ide: Option<String>,

        #[command(flatten)]
        selectors: SelectorArgs,
    },

    /// List tracked repositories
    Repos,

    /// Workspace management
    #[command(subcommand)]
    Workspace(WorkspaceCommands),
}

#[derive(Debug, Subcommand)]
pub enum WorkspaceCommands {
    /// Create a workspace from tracked repositories
    Create {
        name: String,

        /// Member repositories (canonical ids); repeatable
        #[arg(long = "repo", value_name = "ID", required = true)]
        repositories: Vec<String>,
    },

    /// Delete a workspace, its worktrees, and its manifest files
    Delete {
        name: String,

        /// Skip confirmation; keep going on errors
        #[arg(long)]
        force: bool,
    },

    /// List workspaces
    List,
}
