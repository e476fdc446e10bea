//! Error types for git operations.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading the local repository.
#[derive(Debug, Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// HEAD does not point at a branch.
    #[error("HEAD is detached")]
    DetachedHead,

    /// The named remote is not configured.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// The remote URL does not point at Bitbucket Cloud.
    #[error("not a Bitbucket remote URL: {0}")]
    InvalidRemoteUrl(String),

    /// Underlying libgit2 failure.
    #[error(transparent)]
    Git(#[from] git2::Error),
}
