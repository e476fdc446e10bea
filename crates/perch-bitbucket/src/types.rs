//! Bitbucket Cloud API types.
//!
//! Only the fields Perch reads are modelled; everything else in the
//! vendor JSON is ignored on deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a paginated collection.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,

    /// Absolute URL of the next page, absent on the last one.
    #[serde(default)]
    pub next: Option<String>,
}

/// A Bitbucket account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account UUID, wrapped in braces.
    #[serde(default)]
    pub uuid: Option<String>,

    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,

    /// Short handle.
    #[serde(default)]
    pub nickname: Option<String>,

    /// Atlassian account id.
    #[serde(default)]
    pub account_id: Option<String>,
}

/// A hyperlink in a `links` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Href {
    /// Target URL.
    pub href: String,
}

/// The subset of `links` Perch uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    /// Browser URL.
    #[serde(default)]
    pub html: Option<Href>,
}

/// State of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestState {
    /// PR is open.
    Open,
    /// PR was merged.
    Merged,
    /// PR was declined.
    Declined,
    /// PR was replaced by another.
    Superseded,
}

/// A named branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    /// Branch name.
    pub name: String,
}

/// A commit reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    /// Commit SHA.
    pub hash: String,
}

/// A repository reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// `workspace/slug`.
    pub full_name: String,
}

/// Source or destination side of a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Branch.
    pub branch: BranchRef,

    /// Tip commit.
    pub commit: CommitRef,

    /// Repository; absent when the source fork was deleted.
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

/// A Bitbucket Cloud pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR id.
    pub id: u64,

    /// PR title.
    pub title: String,

    /// PR description.
    #[serde(default)]
    pub description: Option<String>,

    /// PR state.
    pub state: PullRequestState,

    /// Author.
    pub author: User,

    /// Branch being merged.
    pub source: Endpoint,

    /// Branch merged into.
    pub destination: Endpoint,

    /// Creation time.
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,

    /// Last update time.
    #[serde(default)]
    pub updated_on: Option<DateTime<Utc>>,

    /// Links.
    #[serde(default)]
    pub links: Links,
}

impl PullRequest {
    /// Browser URL of the PR.
    #[must_use]
    pub fn html_url(&self) -> Option<&str> {
        self.links.html.as_ref().map(|h| h.href.as_str())
    }
}

/// Author of a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    /// `Name <email>` as recorded in git.
    pub raw: String,

    /// Linked Bitbucket account, when known.
    #[serde(default)]
    pub user: Option<User>,
}

/// A commit on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA.
    pub hash: String,

    /// Commit message.
    #[serde(default)]
    pub message: String,

    /// Commit date.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,

    /// Author.
    pub author: CommitAuthor,
}

/// Body of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Raw markdown.
    pub raw: String,
}

/// File location an inline comment is anchored to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineAnchor {
    /// Line on the old side.
    #[serde(default)]
    pub from: Option<u64>,

    /// Line on the new side.
    #[serde(default)]
    pub to: Option<u64>,

    /// File path.
    pub path: String,
}

impl InlineAnchor {
    /// The line the comment points at, preferring the new side.
    #[must_use]
    pub const fn line(&self) -> Option<u64> {
        match (self.to, self.from) {
            (Some(line), _) | (None, Some(line)) => Some(line),
            (None, None) => None,
        }
    }
}

/// A pull request comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id.
    pub id: u64,

    /// Body.
    pub content: Content,

    /// Author.
    pub user: User,

    /// Present for comments attached to a file line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlineAnchor>,

    /// Whether the comment was deleted.
    #[serde(default)]
    pub deleted: bool,

    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,

    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<DateTime<Utc>>,

    /// Links.
    #[serde(default)]
    pub links: Links,
}

impl Comment {
    /// Raw markdown body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.content.raw
    }

    /// Whether this comment is attached to a file line.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.inline.is_some()
    }

    /// Browser URL of the comment.
    #[must_use]
    pub fn html_url(&self) -> Option<&str> {
        self.links.html.as_ref().map(|h| h.href.as_str())
    }
}

/// Kind of a pull request activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// PR fields changed.
    Update,
    /// Someone approved.
    Approval,
    /// Someone requested changes.
    ChangesRequested,
    /// A comment was written.
    Comment,
    /// Anything else.
    Other,
}

/// One entry of the pull request activity stream.
///
/// The stream is a loose union of shapes, so the JSON is kept as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Activity(pub serde_json::Value);

impl Activity {
    /// Which kind of activity this is.
    #[must_use]
    pub fn kind(&self) -> ActivityKind {
        let has = |key: &str| self.0.get(key).is_some();
        if has("update") {
            ActivityKind::Update
        } else if has("approval") {
            ActivityKind::Approval
        } else if has("changes_requested") {
            ActivityKind::ChangesRequested
        } else if has("comment") {
            ActivityKind::Comment
        } else {
            ActivityKind::Other
        }
    }

    /// Display name of the account behind this activity, when present.
    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        let entry = ["update", "approval", "changes_requested", "comment"]
            .iter()
            .find_map(|key| self.0.get(*key))?;
        entry
            .get("author")
            .or_else(|| entry.get("user"))
            .and_then(|u| u.get("display_name"))
            .and_then(serde_json::Value::as_str)
    }
}

/// State of a commit build status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildState {
    /// Still running.
    #[serde(rename = "INPROGRESS")]
    InProgress,
    /// Passed.
    Successful,
    /// Failed.
    Failed,
    /// Stopped before completion.
    Stopped,
}

impl std::str::FromStr for BuildState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inprogress" | "in-progress" | "pending" => Ok(Self::InProgress),
            "successful" | "success" | "passed" => Ok(Self::Successful),
            "failed" | "failure" => Ok(Self::Failed),
            "stopped" => Ok(Self::Stopped),
            _ => Err(format!(
                "invalid build state '{s}' (use pending, successful, failed or stopped)"
            )),
        }
    }
}

/// A commit build status as posted to Bitbucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    /// Status state.
    pub state: BuildState,

    /// Unique key of this status on the commit.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Link shown with the status.
    pub url: String,

    /// Short description.
    pub description: String,
}

/// Line target of a new inline comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineTarget {
    /// Line on the new side.
    pub to: u64,

    /// File path.
    pub path: String,
}

/// Request body for creating or editing a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentPayload {
    /// Body.
    pub content: Content,

    /// File anchor for inline comments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlineTarget>,
}

impl CommentPayload {
    /// A comment body without a file anchor.
    #[must_use]
    pub fn raw(body: impl Into<String>) -> Self {
        Self {
            content: Content { raw: body.into() },
            inline: None,
        }
    }

    /// A comment anchored to `line` of `path`.
    #[must_use]
    pub fn inline(body: impl Into<String>, line: u64, path: impl Into<String>) -> Self {
        Self {
            content: Content { raw: body.into() },
            inline: Some(InlineTarget {
                to: line,
                path: path.into(),
            }),
        }
    }
}
