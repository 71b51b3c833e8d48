//! Subprocess adapter for the [`Git`] port.
//!
//! Shells out to the `git` binary with captured output. Every invocation is
//! logged at debug level as `$ git …`.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};
use crate::git::{Git, GitUrl};

pub struct CliGit;

impl CliGit {
    pub fn new() -> Self {
        Self
    }

    fn command_line(args: &[&str]) -> String {
        format!("git {}", args.join(" "))
    }

    /// Run git, returning stdout on success and `Error::Git` on non-zero exit.
    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        log::debug!("$ {}", Self::command_line(args));
        let mut cmd = Command::new("git");
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        let output = cmd.args(args).output().map_err(Error::Io)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(Error::Git {
                command: Self::command_line(args),
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Run git where a non-zero exit is an expected negative answer rather
    /// than a failure (e.g. `rev-parse --verify`).
    fn succeeds(&self, dir: Option<&Path>, args: &[&str]) -> Result<bool> {
        match self.run(dir, args) {
            Ok(_) => Ok(true),
            Err(Error::Git { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl Default for CliGit {
    fn default() -> Self {
        Self::new()
    }
}

impl Git for CliGit {
    fn status(&self, repo: &Path) -> Result<String> {
        self.run(Some(repo), &["status", "--porcelain"])
    }

    fn is_clean(&self, repo: &Path) -> Result<bool> {
        Ok(self.status(repo)?.trim().is_empty())
    }

    fn is_git_repository(&self, path: &Path) -> bool {
        matches!(
            self.succeeds(Some(path), &["rev-parse", "--is-inside-work-tree"]),
            Ok(true)
        )
    }

    fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool> {
        let r = format!("refs/heads/{branch}");
        self.succeeds(Some(repo), &["rev-parse", "--verify", "--quiet", &r])
    }

    fn branch_exists_on_remote(&self, repo: &Path, remote: &str, branch: &str) -> Result<bool> {
        let r = format!("refs/heads/{branch}");
        let out = self.run(Some(repo), &["ls-remote", "--heads", remote, &r])?;
        Ok(!out.trim().is_empty())
    }

    fn create_branch(&self, repo: &Path, branch: &str, start_point: Option<&str>) -> Result<()> {
        let mut args = vec!["branch", branch];
        if let Some(start) = start_point {
            args.push(start);
        }
        self.run(Some(repo), &args).map(|_| ())
    }

    fn get_branch_remote(&self, repo: &Path, branch: &str) -> Result<Option<String>> {
        let key = format!("branch.{branch}.remote");
        match self.run(Some(repo), &["config", "--get", &key]) {
            Ok(out) => {
                let remote = out.trim();
                Ok((!remote.is_empty()).then(|| remote.to_string()))
            }
            Err(Error::Git { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()> {
        let path_str = path.to_string_lossy();
        self.run(Some(repo), &["worktree", "add", &path_str, branch])
            .map(|_| ())
    }

    fn remove_worktree(&self, repo: &Path, path: &Path, force: bool) -> Result<()> {
        let path_str = path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        self.run(Some(repo), &args).map(|_| ())
    }

    fn remote_exists(&self, repo: &Path, remote: &str) -> Result<bool> {
        let out = self.run(Some(repo), &["remote"])?;
        Ok(out.lines().any(|line| line.trim() == remote))
    }

    fn add_remote(&self, repo: &Path, name: &str, url: &str) -> Result<()> {
        self.run(Some(repo), &["remote", "add", name, url]).map(|_| ())
    }

    fn remove_remote(&self, repo: &Path, name: &str) -> Result<()> {
        self.run(Some(repo), &["remote", "remove", name]).map(|_| ())
    }

    fn get_remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>> {
        match self.run(Some(repo), &["remote", "get-url", remote]) {
            Ok(out) => {
                let url = out.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            Err(Error::Git { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn fetch_remote(&self, repo: &Path, remote: &str) -> Result<()> {
        match self.run(Some(repo), &["fetch", remote]) {
            Ok(_) => Ok(()),
            Err(Error::Git { output, .. }) => Err(Error::FetchFailed {
                remote: remote.to_string(),
                output,
            }),
            Err(e) => Err(e),
        }
    }

    fn get_repository_name(&self, repo: &Path) -> Result<String> {
        if let Some(url) = self.get_remote_url(repo, "origin")?
            && let Ok(parsed) = GitUrl::parse(&url)
        {
            return Ok(parsed.name().to_string());
        }
        let toplevel = self.run(Some(repo), &["rev-parse", "--show-toplevel"])?;
        let toplevel = toplevel.trim();
        Path::new(toplevel)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::GitRepositoryNotFound {
                path: repo.to_path_buf(),
            })
    }

    fn remote_default_branch(&self, url: &str) -> Result<String> {
        let out = self.run(None, &["ls-remote", "--symref", url, "HEAD"])?;
        // First line looks like: "ref: refs/heads/main\tHEAD"
        for line in out.lines() {
            if let Some(rest) = line.strip_prefix("ref:")
                && let Some(branch) = rest.trim().split_whitespace().next()
                && let Some(name) = branch.strip_prefix("refs/heads/")
            {
                return Ok(name.to_string());
            }
        }
        Err(Error::Git {
            command: format!("git ls-remote --symref {url} HEAD"),
            output: "no symref for HEAD in remote advertisement".to_string(),
        })
    }

    fn clone(&self, url: &str, target: &Path) -> Result<()> {
        let target_str = target.to_string_lossy();
        match self.run(None, &["clone", url, &target_str]) {
            Ok(_) => Ok(()),
            Err(Error::Git { output, .. }) => Err(Error::CloneFailed {
                url: url.to_string(),
                output,
            }),
            Err(e) => Err(e),
        }
    }
}
