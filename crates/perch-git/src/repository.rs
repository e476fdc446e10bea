//! Repository wrapper exposing the git facts Perch needs.

use std::path::Path;

use git2::{ErrorCode, Oid};

use crate::error::{Error, Result};

/// Host serving Bitbucket Cloud repositories.
const BITBUCKET_HOST: &str = "bitbucket.org";

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => Error::NotARepository,
            _ => Error::Git(e),
        })?;
        Ok(Self { inner })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    /// Get the name of the current branch.
    ///
    /// # Errors
    /// Returns error if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead);
        }

        head.shorthand()
            .map(String::from)
            .ok_or(Error::DetachedHead)
    }

    /// Get the commit HEAD points at.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be resolved (e.g. an unborn branch).
    pub fn head_commit(&self) -> Result<Oid> {
        Ok(self.inner.head()?.peel_to_commit()?.id())
    }

    /// Get the URL of the origin remote.
    ///
    /// # Errors
    /// Returns error if origin remote is not found.
    pub fn origin_url(&self) -> Result<String> {
        let remote = self
            .inner
            .find_remote("origin")
            .map_err(|_| Error::RemoteNotFound("origin".into()))?;

        remote
            .url()
            .map(String::from)
            .ok_or_else(|| Error::RemoteNotFound("origin".into()))
    }

    /// The `workspace/repo` slug of the origin remote.
    ///
    /// # Errors
    /// Returns error if origin is missing or not a Bitbucket remote.
    pub fn origin_slug(&self) -> Result<String> {
        let url = self.origin_url()?;
        let (workspace, repo) = Self::parse_bitbucket_remote(&url)?;
        Ok(format!("{workspace}/{repo}"))
    }

    /// Parse workspace and repo name from a Bitbucket Cloud URL.
    ///
    /// Supports:
    /// - `git@bitbucket.org:workspace/repo.git`
    /// - `ssh://git@bitbucket.org/workspace/repo.git`
    /// - `https://[user@]bitbucket.org/workspace/repo.git`
    ///
    /// # Errors
    /// Returns error if URL cannot be parsed.
    pub fn parse_bitbucket_remote(url: &str) -> Result<(String, String)> {
        let invalid = || Error::InvalidRemoteUrl(url.to_string());

        let rest = if let Some(rest) = url.strip_prefix("git@bitbucket.org:") {
            rest
        } else if let Some(rest) = url
            .strip_prefix("ssh://")
            .or_else(|| url.strip_prefix("https://"))
            .or_else(|| url.strip_prefix("http://"))
        {
            // Drop optional `user@` and require the Bitbucket host.
            let rest = rest.split_once('@').map_or(rest, |(_, host)| host);
            rest.strip_prefix(BITBUCKET_HOST)
                .and_then(|r| r.strip_prefix('/'))
                .ok_or_else(invalid)?
        } else {
            return Err(invalid());
        };

        let path = rest.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        match path.split_once('/') {
            Some((workspace, repo))
                if !workspace.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok((workspace.to_string(), repo.to_string()))
            }
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish()
    }
}
