//! Top-level façade: one entry point per user-facing verb.
//!
//! Each verb merges its option bundles, validates selector combinations,
//! builds a hook context carrying the inputs verbatim, and dispatches the
//! mode-appropriate driver inside the hook pipeline. Driver errors already
//! belong to the public taxonomy; nothing is re-wrapped here.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::forge::{Forge, IssueInfo, forge_for_host, generate_branch_name, parse_issue_ref};
use crate::fs::Filesystem;
use crate::git::{Git, GitUrl};
use crate::hooks::{HookContext, HookPipeline, OpenIdeHook, TraceHook};
use crate::ide::Ide;
use crate::mode::{self, Mode, Selectors};
use crate::paths::PathBuilder;
use crate::prompt::Prompt;
use crate::repository::{CreateWorktree, RepositoryDriver};
use crate::status::{StatusStore, WorktreeInfo};
use crate::workspace::{WorkspaceDriver, WorkspaceWorktreeRow};

/// Capability providers supplied at construction.
#[derive(Clone)]
pub struct Ports {
    pub fs: Arc<dyn Filesystem>,
    pub git: Arc<dyn Git>,
    pub prompt: Arc<dyn Prompt>,
    pub ide: Arc<dyn Ide>,
    pub forge: Arc<dyn Forge>,
}

/// One bundle of per-operation options. Verbs accept several bundles;
/// merging is field-wise with later values winning.
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    pub force: Option<bool>,
    pub remote: Option<String>,
    pub workspace_name: Option<String>,
    pub repository_name: Option<String>,
    pub ide: Option<String>,
    pub issue: Option<String>,
}

impl OperationOptions {
    pub fn merged(bundles: &[OperationOptions]) -> Self {
        let mut out = Self::default();
        for bundle in bundles {
            if bundle.force.is_some() {
                out.force = bundle.force;
            }
            if bundle.remote.is_some() {
                out.remote = bundle.remote.clone();
            }
            if bundle.workspace_name.is_some() {
                out.workspace_name = bundle.workspace_name.clone();
            }
            if bundle.repository_name.is_some() {
                out.repository_name = bundle.repository_name.clone();
            }
            if bundle.ide.is_some() {
                out.ide = bundle.ide.clone();
            }
            if bundle.issue.is_some() {
                out.issue = bundle.issue.clone();
            }
        }
        out
    }

    fn selectors(&self) -> Selectors {
        Selectors {
            workspace_name: self.workspace_name.clone(),
            repository_name: self.repository_name.clone(),
        }
    }

    fn force(&self) -> bool {
        self.force.unwrap_or(false)
    }
}

/// One row of a worktree listing.
#[derive(Debug, Clone, PartialEq)]
pub struct WorktreeListRow {
    pub repository: String,
    pub info: WorktreeInfo,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryListRow {
    pub id: String,
    pub path: PathBuf,
    pub worktree_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceListRow {
    pub name: String,
    pub repositories: Vec<String>,
    pub worktrees: Vec<String>,
}

pub struct Orchestrator {
    config: Config,
    paths: PathBuilder,
    ports: Ports,
    store: StatusStore,
    hooks: HookPipeline,
}

impl Orchestrator {
    pub fn new(config: Config, ports: Ports, store: StatusStore) -> Self {
        let paths = PathBuilder::new(&config.repositories_dir, &config.workspaces_dir);
        let mut hooks = HookPipeline::new();
        hooks.register(Box::new(TraceHook));
        hooks.register(Box::new(OpenIdeHook::new(ports.ide.clone(), false)));
        Self {
            config,
            paths,
            ports,
            store,
            hooks,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn register_hook(&mut self, hook: Box<dyn crate::hooks::Hook>) {
        self.hooks.register(hook);
    }

    pub fn remove_hook(&mut self, name: &str) -> bool {
        self.hooks.remove(name)
    }

    fn resolve_mode(&self, selectors: &Selectors) -> Result<Mode> {
        let cwd = self.ports.fs.current_dir()?;
        mode::resolve(&*self.ports.fs, &*self.ports.prompt, &cwd, selectors)
    }

    /// Root directory for single-repo operations: the selected repository's
    /// primary clone, or the current directory.
    fn repo_root(&self, opts: &OperationOptions) -> Result<PathBuf> {
        if let Some(name) = &opts.repository_name {
            let repo = self
                .store
                .get_repository(name)
                .ok_or_else(|| Error::RepositoryNotFound { name: name.clone() })?;
            return Ok(repo.path.clone());
        }
        self.ports.fs.current_dir()
    }

    fn base_context(operation: &str, opts: &OperationOptions) -> HookContext {
        let mut ctx = HookContext::new(operation);
        if let Some(v) = &opts.ide {
            ctx.params.insert("ide".into(), v.clone());
        }
        if let Some(v) = &opts.remote {
            ctx.params.insert("remote".into(), v.clone());
        }
        if let Some(v) = &opts.workspace_name {
            ctx.params.insert("workspace".into(), v.clone());
        }
        if let Some(v) = &opts.repository_name {
            ctx.params.insert("repository".into(), v.clone());
        }
        if let Some(v) = &opts.issue {
            ctx.params.insert("issue".into(), v.clone());
        }
        if opts.force() {
            ctx.params.insert("force".into(), "true".into());
        }
        ctx
    }

    /// Resolve an issue reference through the forge selected by the origin
    /// host.
    fn resolve_issue(
        forge: &dyn Forge,
        reference: &str,
        context: Option<&GitUrl>,
    ) -> Result<IssueInfo> {
        let issue = parse_issue_ref(reference, context)?;
        if forge_for_host(&issue.host).is_none() {
            return Err(Error::InvalidIssueRef {
                reference: format!("{} (unsupported forge host '{}')", reference, issue.host),
            });
        }
        forge.get_issue_info(&issue)
    }

    // ------------------------------------------------------------------
    // Verbs
    // ------------------------------------------------------------------

    /// Create a worktree for a branch (or for a branch derived from an
    /// issue). Returns the worktree path (single-repo) or the per-worktree
    /// workspace file path (workspace mode).
    pub fn create_worktree(
        &mut self,
        branch: Option<&str>,
        bundles: &[OperationOptions],
    ) -> Result<PathBuf> {
        let opts = OperationOptions::merged(bundles);
        let selectors = opts.selectors();
        mode::validate_selectors(&selectors)?;

        let mut ctx = Self::base_context("create_worktree", &opts);
        if let Some(b) = branch {
            ctx.params.insert("branch".into(), b.to_string());
        }
        let mode = self.resolve_mode(&selectors)?;
        let root = self.repo_root(&opts)?;

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |ctx| match &mode {
            Mode::SingleRepo => {
                let mut driver = RepositoryDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                    root.clone(),
                );

                let mut issue_info = None;
                if let Some(reference) = &opts.issue {
                    let origin = driver.origin_url()?;
                    issue_info = Some(Self::resolve_issue(
                        &*ports.forge,
                        reference,
                        Some(&origin),
                    )?);
                }
                let branch_name = match branch {
                    Some(b) => b.to_string(),
                    None => {
                        let info = issue_info.as_ref().ok_or_else(|| Error::InvalidInput {
                            reason: "a branch name or --issue is required".to_string(),
                        })?;
                        generate_branch_name(info)
                    }
                };
                ctx.params
                    .insert("branch".into(), branch_name.clone());

                let path = driver.create_worktree(CreateWorktree {
                    branch: branch_name,
                    remote: opts.remote.clone(),
                    from_remote: false,
                    workspace_file: None,
                    issue: issue_info,
                    force: opts.force(),
                })?;
                ctx.results
                    .insert("path".into(), path.display().to_string());
                Ok(path)
            }
            Mode::Workspace(name) => {
                if opts.issue.is_some() {
                    return Err(Error::WorkspaceModeNotSupported {
                        operation: "create_worktree --issue".to_string(),
                    });
                }
                let branch_name = branch.ok_or_else(|| Error::InvalidInput {
                    reason: "a branch name is required".to_string(),
                })?;
                let mut driver = WorkspaceDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                );
                let file = driver.create_worktree(name, branch_name, opts.force())?;
                ctx.results
                    .insert("workspace_file".into(), file.display().to_string());
                Ok(file)
            }
            Mode::None => Err(Error::GitRepositoryNotFound { path: root.clone() }),
        })
    }

    /// Load a branch from a remote source (`[remote:]branch`) and create its
    /// worktree.
    pub fn load_worktree(
        &mut self,
        source: &str,
        bundles: &[OperationOptions],
    ) -> Result<PathBuf> {
        let opts = OperationOptions::merged(bundles);
        let selectors = opts.selectors();
        mode::validate_selectors(&selectors)?;

        let (remote_source, branch_name) = match source.split_once(':') {
            Some((remote, branch)) => (remote.to_string(), branch.to_string()),
            None => (String::new(), source.to_string()),
        };

        let mut ctx = Self::base_context("load_worktree", &opts);
        ctx.params.insert("branch".into(), branch_name.clone());
        ctx.params
            .insert("remote_source".into(), remote_source.clone());

        let mode = self.resolve_mode(&selectors)?;
        let root = self.repo_root(&opts)?;

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |ctx| match &mode {
            Mode::SingleRepo => {
                let mut driver = RepositoryDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                    root.clone(),
                );
                let path = driver.load_worktree(&remote_source, &branch_name)?;
                ctx.results
                    .insert("path".into(), path.display().to_string());
                Ok(path)
            }
            Mode::Workspace(_) => Err(Error::WorkspaceModeNotSupported {
                operation: "load_worktree".to_string(),
            }),
            Mode::None => Err(Error::GitRepositoryNotFound { path: root.clone() }),
        })
    }

    pub fn delete_worktree(&mut self, branch: &str, bundles: &[OperationOptions]) -> Result<()> {
        let opts = OperationOptions::merged(bundles);
        let selectors = opts.selectors();
        mode::validate_selectors(&selectors)?;

        let mut ctx = Self::base_context("delete_worktree", &opts);
        ctx.params.insert("branch".into(), branch.to_string());
        let mode = self.resolve_mode(&selectors)?;
        let root = self.repo_root(&opts)?;

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |_| match &mode {
            Mode::SingleRepo => {
                let mut driver = RepositoryDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                    root.clone(),
                );
                driver.delete_worktree(branch, opts.force())
            }
            Mode::Workspace(name) => {
                let mut driver = WorkspaceDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                );
                driver.delete_worktree(name, branch, opts.force())
            }
            Mode::None => Err(Error::GitRepositoryNotFound { path: root.clone() }),
        })
    }

    pub fn delete_all_worktrees(&mut self, bundles: &[OperationOptions]) -> Result<()> {
        let opts = OperationOptions::merged(bundles);
        let selectors = opts.selectors();
        mode::validate_selectors(&selectors)?;

        let mut ctx = Self::base_context("delete_all_worktrees", &opts);
        let mode = self.resolve_mode(&selectors)?;
        let root = self.repo_root(&opts)?;

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |_| match &mode {
            Mode::SingleRepo => {
                let mut driver = RepositoryDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                    root.clone(),
                );
                driver.delete_all_worktrees(opts.force())
            }
            Mode::Workspace(_) => Err(Error::WorkspaceModeNotSupported {
                operation: "delete_all_worktrees".to_string(),
            }),
            Mode::None => Err(Error::GitRepositoryNotFound { path: root.clone() }),
        })
    }

    /// List worktrees for the current context; with no context, every
    /// tracked worktree.
    pub fn list_worktrees(&mut self, bundles: &[OperationOptions]) -> Result<Vec<WorktreeListRow>> {
        let opts = OperationOptions::merged(bundles);
        let selectors = opts.selectors();
        mode::validate_selectors(&selectors)?;

        let mut ctx = Self::base_context("list_worktrees", &opts);
        let mode = self.resolve_mode(&selectors)?;
        let root = self.repo_root(&opts)?;

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |_| match &mode {
            Mode::SingleRepo => {
                let driver = RepositoryDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                    root.clone(),
                );
                let repo_id = driver.canonical_id()?;
                let infos = driver.list_worktrees()?;
                infos
                    .into_iter()
                    .map(|info| {
                        let path = paths.worktree_path(&repo_id, &info.remote, &info.branch)?;
                        Ok(WorktreeListRow {
                            repository: repo_id.clone(),
                            info,
                            path,
                        })
                    })
                    .collect()
            }
            Mode::Workspace(name) => {
                let driver = WorkspaceDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                );
                let rows = driver.list_worktrees(name)?;
                let mut out = Vec::new();
                for WorkspaceWorktreeRow {
                    branch,
                    repositories,
                } in rows
                {
                    for repo_id in repositories {
                        if let Some(info) = store.get_worktree(&repo_id, &branch) {
                            let path =
                                paths.worktree_path(&repo_id, &info.remote, &info.branch)?;
                            out.push(WorktreeListRow {
                                repository: repo_id.clone(),
                                info: info.clone(),
                                path,
                            });
                        }
                    }
                }
                Ok(out)
            }
            Mode::None => store
                .list_all_worktrees()
                .into_iter()
                .map(|(repo_id, info)| {
                    let path = paths.worktree_path(&repo_id, &info.remote, &info.branch)?;
                    Ok(WorktreeListRow {
                        repository: repo_id,
                        info,
                        path,
                    })
                })
                .collect(),
        })
    }

    /// Resolve the path to open for a branch: the worktree directory in
    /// single-repo mode, the per-worktree workspace file in workspace mode.
    /// The IDE launch itself is the open-ide hook's effect.
    pub fn open_worktree(&mut self, branch: &str, bundles: &[OperationOptions]) -> Result<PathBuf> {
        let opts = OperationOptions::merged(bundles);
        let selectors = opts.selectors();
        mode::validate_selectors(&selectors)?;

        let mut ctx = Self::base_context("open_worktree", &opts);
        ctx.params.insert("branch".into(), branch.to_string());
        let mode = self.resolve_mode(&selectors)?;
        let root = self.repo_root(&opts)?;

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |ctx| match &mode {
            Mode::SingleRepo => {
                let driver = RepositoryDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                    root.clone(),
                );
                let repo_id = driver.canonical_id()?;
                let info = store
                    .get_worktree(&repo_id, branch)
                    .ok_or_else(|| Error::WorktreeNotInStatus {
                        branch: branch.to_string(),
                    })?
                    .clone();
                let path = paths.worktree_path(&repo_id, &info.remote, &info.branch)?;
                ctx.results
                    .insert("path".into(), path.display().to_string());
                Ok(path)
            }
            Mode::Workspace(name) => {
                let driver = WorkspaceDriver::new(
                    &*ports.fs,
                    &*ports.git,
                    &*ports.prompt,
                    paths,
                    store,
                );
                let file = driver.open_worktree(name, branch)?;
                ctx.results
                    .insert("workspace_file".into(), file.display().to_string());
                Ok(file)
            }
            Mode::None => Err(Error::GitRepositoryNotFound { path: root.clone() }),
        })
    }

    /// Clone a repository into the managed layout and track it.
    pub fn clone_repository(
        &mut self,
        url: &str,
        bundles: &[OperationOptions],
    ) -> Result<PathBuf> {
        let opts = OperationOptions::merged(bundles);
        let mut ctx = Self::base_context("clone", &opts);
        ctx.params.insert("url".into(), url.to_string());
        let root = self.ports.fs.current_dir()?;

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |ctx| {
            let mut driver = RepositoryDriver::new(
                &*ports.fs,
                &*ports.git,
                &*ports.prompt,
                paths,
                store,
                root.clone(),
            );
            let path = driver.clone_repository(url)?;
            ctx.results
                .insert("path".into(), path.display().to_string());
            Ok(path)
        })
    }

    pub fn list_repositories(&mut self) -> Result<Vec<RepositoryListRow>> {
        let mut ctx = HookContext::new("list_repositories");
        let Self { hooks, store, .. } = self;
        hooks.run(&mut ctx, |_| {
            let mut rows: Vec<RepositoryListRow> = store
                .snapshot()
                .repositories
                .iter()
                .map(|(id, repo)| RepositoryListRow {
                    id: id.clone(),
                    path: repo.path.clone(),
                    worktree_count: repo.worktrees.len(),
                })
                .collect();
            rows.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(rows)
        })
    }

    /// Create a workspace from tracked repositories. Returns the manifest
    /// path.
    pub fn create_workspace(
        &mut self,
        name: &str,
        repositories: &[String],
        bundles: &[OperationOptions],
    ) -> Result<PathBuf> {
        let opts = OperationOptions::merged(bundles);
        let mut ctx = Self::base_context("create_workspace", &opts);
        ctx.params.insert("name".into(), name.to_string());
        ctx.params
            .insert("repositories".into(), repositories.join(","));

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |ctx| {
            let mut driver =
                WorkspaceDriver::new(&*ports.fs, &*ports.git, &*ports.prompt, paths, store);
            let file = driver.create_workspace(name, repositories.to_vec())?;
            ctx.results
                .insert("workspace_file".into(), file.display().to_string());
            Ok(file)
        })
    }

    pub fn delete_workspace(&mut self, name: &str, bundles: &[OperationOptions]) -> Result<()> {
        let opts = OperationOptions::merged(bundles);
        let mut ctx = Self::base_context("delete_workspace", &opts);
        ctx.params.insert("name".into(), name.to_string());

        let Self {
            hooks,
            store,
            ports,
            paths,
            ..
        } = self;
        hooks.run(&mut ctx, |_| {
            let mut driver =
                WorkspaceDriver::new(&*ports.fs, &*ports.git, &*ports.prompt, paths, store);
            driver.delete_workspace(name, opts.force())
        })
    }

    pub fn list_workspaces(&mut self) -> Result<Vec<WorkspaceListRow>> {
        let mut ctx = HookContext::new("list_workspaces");
        let Self { hooks, store, .. } = self;
        hooks.run(&mut ctx, |_| {
            let mut rows: Vec<WorkspaceListRow> = store
                .snapshot()
                .workspaces
                .iter()
                .map(|(name, workspace)| WorkspaceListRow {
                    name: name.clone(),
                    repositories: workspace.repositories.clone(),
                    worktrees: workspace.worktrees.clone(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(rows)
        })
    }

    /// Read-only snapshot of the whole status document.
    pub fn status(&self) -> &crate::status::StatusDocument {
        self.store.snapshot()
    }
}
