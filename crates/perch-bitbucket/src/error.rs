//! Error types for Bitbucket API operations.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to Bitbucket Cloud.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable credentials in the environment.
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// The OAuth client-credentials exchange failed.
    #[error("OAuth token exchange failed: {0}")]
    OAuth(String),

    /// Bitbucket rejected the credentials (401).
    #[error("authentication failed - check your Bitbucket credentials")]
    AuthenticationFailed,

    /// Too many requests (429).
    #[error("rate limited by Bitbucket - try again later")]
    RateLimited,

    /// The requested resource does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("Bitbucket API error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Response body, usually a JSON error document.
        message: String,
    },

    /// Deleting a comment did not succeed.
    #[error("failed to delete comment {0}")]
    CommentDeletion(u64),

    /// A pull request id was required but none was configured.
    #[error("no pull request selected")]
    NoPullRequest,

    /// A request URL could not be built.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
