//! Reconciling a run's results with the comments already on a PR.
//!
//! A run owns at most one main comment and one inline comment per file
//! location. Publishing edits those in place, posts what is missing and
//! deletes what no longer applies; comments from other marker ids or
//! other accounts are left alone.

use std::collections::HashMap;

use perch_bitbucket::{BitbucketClient, BuildState, BuildStatus};
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::marker::{self, Location, MarkerId};
use crate::ownership::{self, InlineComment};
use crate::results::Results;
use crate::template;

/// What a publish changed on the pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishSummary {
    /// Browser URL of the main comment, when one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_comment_url: Option<String>,
    /// Whether stale main comments were removed instead.
    pub main_comment_deleted: bool,
    /// Inline comments posted.
    pub inline_created: usize,
    /// Inline comments edited.
    pub inline_updated: usize,
    /// Inline comments left as they were.
    pub inline_unchanged: usize,
    /// Inline comments removed.
    pub inline_deleted: usize,
    /// Whether the build status was accepted.
    pub status_posted: bool,
}

/// Publishes results for one marker id through a client.
#[derive(Debug)]
pub struct Publisher<'a> {
    client: &'a BitbucketClient,
    id: MarkerId,
    status_key: String,
    status_name: String,
    status_url: String,
}

impl<'a> Publisher<'a> {
    /// Create a publisher using the marker id and status settings from
    /// `config`.
    #[must_use]
    pub fn new(client: &'a BitbucketClient, config: &Config) -> Self {
        Self {
            client,
            id: config.marker_id(),
            status_key: config.status_key(),
            status_name: config.status.name.clone(),
            status_url: config.status.url.clone(),
        }
    }

    /// The marker id this publisher writes under.
    #[must_use]
    pub const fn marker_id(&self) -> &MarkerId {
        &self.id
    }

    /// `commit`, or the source commit of the pull request.
    async fn resolve_commit(&self, commit: Option<&str>) -> Result<String> {
        match commit {
            Some(commit) => Ok(commit.to_string()),
            None => Ok(self.client.pull_request().await?.source.commit.hash.clone()),
        }
    }

    /// Write `body` as the main comment.
    ///
    /// Edits the first owned main comment and deletes any further ones, or
    /// posts a new comment when none exists. The body is wrapped with the
    /// marker and signature.
    ///
    /// # Errors
    /// Returns error if any API call fails.
    pub async fn update_or_create_main_comment(&self, body: &str) -> Result<Option<String>> {
        self.write_main_comment(body, None).await
    }

    async fn write_main_comment(&self, body: &str, commit: Option<&str>) -> Result<Option<String>> {
        let commit = self.resolve_commit(commit).await.ok();
        let body = marker::render_main(&self.id, body, commit.as_deref());
        let existing = ownership::fetch_main_comments(self.client, &self.id).await?;

        let comment = match existing.split_first() {
            Some((first, rest)) => {
                tracing::debug!(id = first.id, "updating main comment");
                let updated = self.client.update_comment(first.id, &body).await?;
                for stale in rest {
                    tracing::debug!(id = stale.id, "deleting duplicate main comment");
                    self.client.delete_comment(stale.id).await?;
                }
                updated
            }
            None => {
                tracing::debug!("posting main comment");
                self.client.post_comment(&body).await?
            }
        };

        Ok(comment.html_url().map(String::from))
    }

    /// Delete every owned main comment.
    ///
    /// Returns whether there was anything to delete.
    ///
    /// # Errors
    /// Returns error if any API call fails.
    pub async fn delete_main_comments(&self) -> Result<bool> {
        let existing = ownership::fetch_main_comments(self.client, &self.id).await?;
        for comment in &existing {
            self.client.delete_comment(comment.id).await?;
        }
        Ok(!existing.is_empty())
    }

    /// Post a build status on the PR's source commit.
    ///
    /// Failures are logged and reported as `false`.
    pub async fn update_status(
        &self,
        state: BuildState,
        description: &str,
        url: Option<&str>,
    ) -> bool {
        self.post_status(state, description, url, None).await
    }

    async fn post_status(
        &self,
        state: BuildState,
        description: &str,
        url: Option<&str>,
        commit: Option<&str>,
    ) -> bool {
        let commit = match self.resolve_commit(commit).await {
            Ok(commit) => commit,
            Err(e) => {
                tracing::warn!(error = %e, "cannot resolve commit for build status");
                return false;
            }
        };

        let status = BuildStatus {
            state,
            key: self.status_key.clone(),
            name: self.status_name.clone(),
            url: url.unwrap_or(&self.status_url).to_string(),
            description: description.to_string(),
        };

        match self.client.post_build_status(&commit, &status).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, commit, "failed to post build status");
                false
            }
        }
    }

    /// Publish `results`: inline comments, then the main comment, then the
    /// build status.
    ///
    /// `commit` is named in the signature and receives the status; it
    /// defaults to the pull request's source commit.
    ///
    /// # Errors
    /// Returns error if a comment operation fails. A rejected build status
    /// is reported in the summary instead.
    pub async fn publish(&self, results: &Results, commit: Option<&str>) -> Result<PublishSummary> {
        let mut summary = PublishSummary::default();
        let groups = results.inline_groups();

        let mut existing: HashMap<Location, Vec<InlineComment>> = HashMap::new();
        let mut unanchored = Vec::new();
        for comment in ownership::fetch_inline_comments(self.client, &self.id).await? {
            if !comment.owned {
                continue;
            }
            match comment.location.clone() {
                Some(location) => existing.entry(location).or_default().push(comment),
                None => unanchored.push(comment),
            }
        }

        for (location, group) in &groups {
            let body = marker::render_inline(
                &self.id,
                &location.path,
                location.line,
                &template::inline_comment(group),
            );

            let current = existing.get_mut(location).and_then(|c| c.pop());
            match current {
                Some(comment) if comment.body == body => summary.inline_unchanged += 1,
                Some(comment) => {
                    self.client.update_comment(comment.id, &body).await?;
                    summary.inline_updated += 1;
                }
                None => {
                    self.client
                        .post_inline_comment(&body, location.line, &location.path)
                        .await?;
                    summary.inline_created += 1;
                }
            }
        }

        let stale = existing.into_values().flatten().chain(unanchored);
        for comment in stale {
            tracing::debug!(id = comment.id, "deleting stale inline comment");
            self.client.delete_comment(comment.id).await?;
            summary.inline_deleted += 1;
        }

        let inline_count: usize = groups.values().map(|g| g.iter().count()).sum();
        if results.is_empty() {
            summary.main_comment_deleted = self.delete_main_comments().await?;
        } else {
            let body = template::main_comment(&results.main_results(), inline_count);
            summary.main_comment_url = self.write_main_comment(&body, commit).await?;
        }

        let state = if results.is_success() {
            BuildState::Successful
        } else {
            BuildState::Failed
        };
        summary.status_posted = self
            .post_status(state, &template::status_description(results), None, commit)
            .await;

        Ok(summary)
    }
}
