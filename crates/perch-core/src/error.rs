//! Error types for perch-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A marker id that cannot be embedded in a comment.
    #[error("invalid marker id '{id}': {reason}")]
    InvalidMarkerId {
        /// The rejected id.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A config file could not be parsed.
    #[error("invalid config in {}: {message}", .path.display())]
    Config {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A results file could not be decoded.
    #[error("invalid results: {0}")]
    Results(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bitbucket API failure.
    #[error(transparent)]
    Bitbucket(#[from] perch_bitbucket::Error),
}
