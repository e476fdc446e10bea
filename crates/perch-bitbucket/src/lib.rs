//! # perch-bitbucket
//!
//! Bitbucket Cloud API integration for Perch, providing pull request
//! metadata, comment management and commit build statuses.

mod auth;
mod client;
mod error;
mod types;

pub use auth::Credentials;
pub use client::{BitbucketClient, RepoMetadata};
pub use error::{Error, Result};
pub use types::{
    Activity, ActivityKind, BranchRef, BuildState, BuildStatus, Comment, CommentPayload, Commit,
    CommitAuthor, CommitRef, Content, Endpoint, Href, InlineAnchor, InlineTarget, Links, Page,
    PullRequest, PullRequestState, RepositoryRef, User,
};
