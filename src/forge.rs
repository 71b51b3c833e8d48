//! Forge integration: resolving issue references to branch-name metadata.
//!
//! The concrete client is a capability behind [`Forge`]; the production
//! adapter shells out to the `gh` CLI. Which forge applies is derived from
//! the repository's origin URL host.

use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::git::GitUrl;

/// Issue metadata snapshot stored alongside a worktree entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueInfo {
    pub number: u64,
    pub title: String,
    pub url: String,
}

/// A fully resolved issue coordinate: forge host, repository, number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

/// Forges grove knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ForgeKind {
    Github,
}

/// Pick the forge for a repository host, if any is supported.
pub fn forge_for_host(host: &str) -> Option<ForgeKind> {
    (host == "github.com").then_some(ForgeKind::Github)
}

/// Capability interface for fetching issue metadata.
pub trait Forge: Send + Sync {
    fn get_issue_info(&self, issue: &IssueRef) -> Result<IssueInfo>;
}

/// Parse a user-supplied issue reference.
///
/// Accepted forms:
/// - `https://<host>/<owner>/<repo>/issues/<n>`
/// - `<owner>/<repo>#<n>` (host taken from context, default `github.com`)
/// - `#<n>` or `<n>`, which require a repository context (origin URL)
pub fn parse_issue_ref(input: &str, context: Option<&GitUrl>) -> Result<IssueRef> {
    let trimmed = input.trim();
    let invalid = || Error::InvalidIssueRef {
        reference: trimmed.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid());
    }

    if let Some(rest) = trimmed.strip_prefix("https://") {
        let segments: Vec<&str> = rest.split('/').collect();
        if let [host, owner, repo, "issues", number] = segments.as_slice() {
            let number = number.parse::<u64>().map_err(|_| invalid())?;
            return Ok(IssueRef {
                host: host.to_string(),
                owner: owner.to_string(),
                repo: repo.to_string(),
                number,
            });
        }
        return Err(invalid());
    }

    if let Some((repo_part, number_part)) = trimmed.split_once('#')
        && !repo_part.is_empty()
    {
        let (owner, repo) = repo_part.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || repo.is_empty() {
            return Err(invalid());
        }
        let number = number_part.parse::<u64>().map_err(|_| invalid())?;
        let host = context.map_or_else(|| "github.com".to_string(), |c| c.host().to_string());
        return Ok(IssueRef {
            host,
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        });
    }

    // Bare "#123" or "123": needs the current repository for coordinates.
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let number = digits.parse::<u64>().map_err(|_| invalid())?;
    let context = context.ok_or_else(|| Error::IssueNumberRequiresContext {
        reference: trimmed.to_string(),
    })?;
    Ok(IssueRef {
        host: context.host().to_string(),
        owner: context.owner().to_string(),
        repo: context.name().to_string(),
        number,
    })
}

/// Derive a branch name from issue metadata: `<number>-<slugified title>`,
/// truncated to keep paths workable.
pub fn generate_branch_name(info: &IssueInfo) -> String {
    const MAX_SLUG_LEN: usize = 50;

    let mut slug = String::new();
    let mut last_dash = true;
    for c in info.title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        format!("{}", info.number)
    } else {
        format!("{}-{}", info.number, slug)
    }
}

/// `gh` CLI adapter. Only valid for GitHub hosts; callers select it via
/// [`forge_for_host`].
pub struct GhCliForge;

impl GhCliForge {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GhCliForge {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    url: String,
}

impl Forge for GhCliForge {
    fn get_issue_info(&self, issue: &IssueRef) -> Result<IssueInfo> {
        let repo = format!("{}/{}", issue.owner, issue.repo);
        let number = issue.number.to_string();
        let args = [
            "issue",
            "view",
            &number,
            "--repo",
            &repo,
            "--json",
            "number,title,url",
        ];
        log::debug!("$ gh {}", args.join(" "));
        let output = Command::new("gh").args(args).output().map_err(Error::Io)?;
        if !output.status.success() {
            return Err(Error::InvalidIssueRef {
                reference: format!("{repo}#{number}"),
            });
        }
        let parsed: GhIssue =
            serde_json::from_slice(&output.stdout).map_err(|e| Error::InvalidIssueRef {
                reference: format!("{repo}#{number}: {e}"),
            })?;
        Ok(IssueInfo {
            number: parsed.number,
            title: parsed.title,
            url: parsed.url,
        })
    }
}
