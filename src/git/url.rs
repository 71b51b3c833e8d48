//! Git remote URL parsing and normalization.
//!
//! Parses HTTPS and SSH remote URLs into structured components and derives
//! the canonical repository identifier (`host/owner/name`) used throughout
//! the status document and the worktree path layout.

use crate::error::{Error, Result};

/// The protocol style of a remote URL, preserved so derived remotes keep the
/// original form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlScheme {
    /// `https://<host>/<owner>/<name>.git`
    Https,
    /// `git@<host>:<owner>/<name>.git`
    Ssh,
}

/// Parsed git remote URL.
///
/// # Example
///
/// ```
/// use grove::git::GitUrl;
///
/// let url = GitUrl::parse("git@github.com:lerenn/example.git").unwrap();
/// assert_eq!(url.canonical_id(), "github.com/lerenn/example");
/// assert_eq!(
///     url.with_owner("otheruser").to_url_string(),
///     "git@github.com:otheruser/example.git"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitUrl {
    scheme: UrlScheme,
    host: String,
    owner: String,
    name: String,
}

impl GitUrl {
    /// Parse an HTTPS (`https://host/owner/name(.git)?`) or SSH
    /// (`git@host:owner/name(.git)?`) remote URL.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();

        let unsupported = || Error::UnsupportedUrl {
            url: url.trim().to_string(),
        };

        let (scheme, host, owner, name) = if let Some(rest) = trimmed.strip_prefix("https://") {
            let mut parts = rest.split('/');
            let host = parts.next().ok_or_else(unsupported)?;
            let owner = parts.next().ok_or_else(unsupported)?;
            let name = parts.next().ok_or_else(unsupported)?;
            if parts.next().is_some() {
                return Err(unsupported());
            }
            (UrlScheme::Https, host, owner, name)
        } else if let Some(rest) = trimmed.strip_prefix("git@") {
            let (host, path) = rest.split_once(':').ok_or_else(unsupported)?;
            let mut parts = path.split('/');
            let owner = parts.next().ok_or_else(unsupported)?;
            let name = parts.next().ok_or_else(unsupported)?;
            if parts.next().is_some() {
                return Err(unsupported());
            }
            (UrlScheme::Ssh, host, owner, name)
        } else {
            return Err(unsupported());
        };

        let name = name.strip_suffix(".git").unwrap_or(name);

        if host.is_empty() || owner.is_empty() || name.is_empty() {
            return Err(unsupported());
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Canonical repository identifier: `host/owner/name`, no scheme, no
    /// `.git` suffix.
    pub fn canonical_id(&self) -> String {
        format!("{}/{}/{}", self.host, self.owner, self.name)
    }

    /// The same repository under a different owner, e.g. a user's fork.
    /// Scheme and host are preserved.
    pub fn with_owner(&self, owner: &str) -> GitUrl {
        GitUrl {
            scheme: self.scheme,
            host: self.host.clone(),
            owner: owner.to_string(),
            name: self.name.clone(),
        }
    }

    /// Render back to a fetchable URL in the original protocol style.
    pub fn to_url_string(&self) -> String {
        match self.scheme {
            UrlScheme::Https => {
                format!("https://{}/{}/{}.git", self.host, self.owner, self.name)
            }
            UrlScheme::Ssh => format!("git@{}:{}/{}.git", self.host, self.owner, self.name),
        }
    }

    pub fn scheme(&self) -> UrlScheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Normalize a remote URL or an already-canonical identifier to the
/// canonical `host/owner/name` form.
///
/// Accepting the canonical form makes normalization idempotent:
/// `normalize_identifier(normalize_identifier(u)) == normalize_identifier(u)`.
pub fn normalize_identifier(input: &str) -> Result<String> {
    if let Ok(url) = GitUrl::parse(input) {
        return Ok(url.canonical_id());
    }

    let trimmed = input.trim();
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.len() == 3 && segments.iter().all(|s| !s.is_empty() && !s.contains(':')) {
        let name = segments[2].strip_suffix(".git").unwrap_or(segments[2]);
        return Ok(format!("{}/{}/{}", segments[0], segments[1], name));
    }

    Err(Error::UnsupportedUrl {
        url: trimmed.to_string(),
    })
}
