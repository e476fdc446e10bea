//! Bitbucket Cloud API client.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::auth::{Credentials, Method};
use crate::error::{Error, Result};
use crate::types::{
    Activity, BuildStatus, Comment, CommentPayload, Commit, Page, PullRequest, User,
};

/// The repository and pull request a client works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMetadata {
    /// `workspace/repo`.
    pub repo_slug: String,

    /// Pull request id; PR-scoped calls fail without one.
    pub pull_request_id: Option<u64>,
}

impl RepoMetadata {
    /// Metadata for a repository and one of its pull requests.
    #[must_use]
    pub fn new(repo_slug: impl Into<String>, pull_request_id: u64) -> Self {
        Self {
            repo_slug: repo_slug.into(),
            pull_request_id: Some(pull_request_id),
        }
    }

    /// Metadata for a repository without a selected pull request.
    #[must_use]
    pub fn repository(repo_slug: impl Into<String>) -> Self {
        Self {
            repo_slug: repo_slug.into(),
            pull_request_id: None,
        }
    }
}

/// Bitbucket Cloud API client scoped to one repository.
///
/// The pull request and its commits are fetched once per client and
/// reused by later calls.
pub struct BitbucketClient {
    client: Client,
    base_url: String,
    oauth_url: String,
    repo: RepoMetadata,
    credentials: Credentials,
    access_token: OnceCell<SecretString>,
    uuid: OnceCell<Option<String>>,
    pr: OnceCell<PullRequest>,
    commits: OnceCell<Vec<Commit>>,
}

impl BitbucketClient {
    /// Default Bitbucket Cloud API URL.
    pub const DEFAULT_API_URL: &'static str = "https://api.bitbucket.org/2.0";

    /// Default OAuth token endpoint.
    pub const DEFAULT_OAUTH_URL: &'static str = "https://bitbucket.org/site/oauth2/access_token";

    /// Create a new Bitbucket client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(repo: RepoMetadata, credentials: Credentials) -> Result<Self> {
        Self::with_base_url(repo, credentials, Self::DEFAULT_API_URL)
    }

    /// Create a new Bitbucket client against a custom API URL.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_base_url(
        repo: RepoMetadata,
        credentials: Credentials,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("perch"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            oauth_url: Self::DEFAULT_OAUTH_URL.to_string(),
            repo,
            credentials,
            access_token: OnceCell::new(),
            uuid: OnceCell::new(),
            pr: OnceCell::new(),
            commits: OnceCell::new(),
        })
    }

    /// Use a different OAuth token endpoint.
    #[must_use]
    pub fn with_oauth_url(mut self, oauth_url: impl Into<String>) -> Self {
        self.oauth_url = oauth_url.into();
        self
    }

    /// Select the pull request later calls work on.
    ///
    /// Anything memoized for a previously selected pull request is dropped.
    #[must_use]
    pub fn with_pull_request(mut self, id: u64) -> Self {
        self.repo.pull_request_id = Some(id);
        self.pr = OnceCell::new();
        self.commits = OnceCell::new();
        self
    }

    /// The repository and pull request this client works on.
    #[must_use]
    pub const fn repo(&self) -> &RepoMetadata {
        &self.repo
    }

    fn repo_url(&self) -> String {
        format!("{}/repositories/{}", self.base_url, self.repo.repo_slug)
    }

    fn pr_url(&self) -> Result<String> {
        let id = self.repo.pull_request_id.ok_or(Error::NoPullRequest)?;
        Ok(format!("{}/pullrequests/{id}", self.repo_url()))
    }

    // === Request plumbing ===

    /// Exchange the OAuth consumer for an access token.
    async fn exchange_oauth(&self, key: &str, secret: &SecretString) -> Result<SecretString> {
        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        tracing::debug!(url = %self.oauth_url, "exchanging OAuth client credentials");
        let response = self
            .client
            .post(&self.oauth_url)
            .basic_auth(key, Some(secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::OAuth(format!("{}: {text}", status.as_u16())));
        }

        let token: TokenResponse = serde_json::from_str(&response.text().await?)?;
        Ok(SecretString::from(token.access_token))
    }

    /// Attach the authorization header.
    async fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match self.credentials.method() {
            Method::Password { username, password } => {
                builder.basic_auth(username, Some(password.expose_secret()))
            }
            Method::OAuth { key, secret } => {
                let token = self
                    .access_token
                    .get_or_try_init(|| self.exchange_oauth(key, secret))
                    .await?;
                builder.bearer_auth(token.expose_secret())
            }
            Method::AccessToken(token) => builder.bearer_auth(token.expose_secret()),
        })
    }

    /// Build an authorized request.
    async fn request(&self, method: reqwest::Method, url: &str) -> Result<RequestBuilder> {
        tracing::debug!(%method, url, "bitbucket request");
        self.authorize(self.client.request(method, url)).await
    }

    /// Make a GET request.
    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.request(reqwest::Method::GET, url).await?.send().await?;
        Self::handle_response(response).await
    }

    /// Make a GET request and hand back the raw response.
    async fn get_raw(&self, url: &str) -> Result<Response> {
        Ok(self.request(reqwest::Method::GET, url).await?.send().await?)
    }

    /// Make a POST request.
    async fn post<T, B>(&self, url: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let response = self
            .request(reqwest::Method::POST, url)
            .await?
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make a PUT request.
    async fn put<T, B>(&self, url: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let response = self
            .request(reqwest::Method::PUT, url)
            .await?
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make a DELETE request.
    async fn delete(&self, url: &str) -> Result<Response> {
        Ok(self
            .request(reqwest::Method::DELETE, url)
            .await?
            .json(&serde_json::json!({}))
            .send()
            .await?)
    }

    /// Follow `next` links until the last page, concatenating values.
    async fn get_all<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>> {
        let mut values = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next {
            let page: Page<T> = self.get(&url).await?;
            values.extend(page.values);

            next = page.next;
            if next.as_deref() == Some(url.as_str()) {
                tracing::warn!(url, "page links to itself, stopping pagination");
                break;
            }
        }

        Ok(values)
    }

    /// Handle API response.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            let text = response.text().await?;
            return Ok(serde_json::from_str(&text)?);
        }

        Err(Self::error_for(response).await)
    }

    /// Map a non-success response to an error.
    async fn error_for(response: Response) -> Error {
        match response.status() {
            StatusCode::UNAUTHORIZED => Error::AuthenticationFailed,
            StatusCode::TOO_MANY_REQUESTS => Error::RateLimited,
            StatusCode::NOT_FOUND => Error::NotFound(response.url().path().to_string()),
            status => {
                let text = response.text().await.unwrap_or_default();
                Error::ApiError {
                    status: status.as_u16(),
                    message: text,
                }
            }
        }
    }

    // === Account ===

    /// Get the account the credentials belong to.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn current_user(&self) -> Result<User> {
        self.get(&format!("{}/user", self.base_url)).await
    }

    /// UUID of the account this client acts as.
    ///
    /// Uses the configured UUID, otherwise asks the API once. A failed
    /// lookup is logged and leaves the UUID unknown.
    pub async fn account_uuid(&self) -> Option<&str> {
        self.uuid
            .get_or_init(|| async {
                if let Some(uuid) = self.credentials.uuid() {
                    return Some(uuid.to_string());
                }
                match self.current_user().await {
                    Ok(user) => user.uuid,
                    Err(e) => {
                        tracing::warn!(error = %e, "could not resolve account UUID");
                        None
                    }
                }
            })
            .await
            .as_deref()
    }

    // === PR Operations ===

    /// Find pull requests whose source branch is `branch`.
    ///
    /// # Errors
    /// Returns error if any page fails to load.
    pub async fn pull_requests_for_branch(&self, branch: &str) -> Result<Vec<PullRequest>> {
        let branch = branch.replace('\\', "\\\\").replace('"', "\\\"");
        let query = format!("source.branch.name = \"{branch}\"");
        let url = Url::parse_with_params(
            &format!("{}/pullrequests", self.repo_url()),
            &[("q", query.as_str())],
        )
        .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        self.get_all(url.into()).await
    }

    /// Get the selected pull request.
    ///
    /// # Errors
    /// Returns error if no PR is selected or the API call fails.
    pub async fn pull_request(&self) -> Result<&PullRequest> {
        let url = self.pr_url()?;
        self.pr.get_or_try_init(|| self.get(&url)).await
    }

    /// List every commit on the selected pull request.
    ///
    /// # Errors
    /// Returns error if any page fails to load.
    pub async fn commits(&self) -> Result<&[Commit]> {
        let url = format!("{}/commits", self.pr_url()?);
        let commits = self.commits.get_or_try_init(|| self.get_all(url)).await?;
        Ok(commits.as_slice())
    }

    /// Get the unified diff of the selected pull request.
    ///
    /// A non-success response yields an empty diff.
    ///
    /// # Errors
    /// Returns error on transport failure.
    pub async fn diff(&self) -> Result<String> {
        let url = format!("{}/diff", self.pr_url()?);
        let response = self.get_raw(&url).await?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "diff unavailable");
            return Ok(String::new());
        }

        Ok(response.text().await?)
    }

    /// List the non-deleted comments on the selected pull request.
    ///
    /// # Errors
    /// Returns error if any page fails to load.
    pub async fn comments(&self) -> Result<Vec<Comment>> {
        let url = format!("{}/comments?q=deleted=false", self.pr_url()?);
        self.get_all(url).await
    }

    /// List the activity stream of the selected pull request.
    ///
    /// # Errors
    /// Returns error if any page fails to load.
    pub async fn activities(&self) -> Result<Vec<Activity>> {
        let url = format!("{}/activity", self.pr_url()?);
        self.get_all(url).await
    }

    /// Read a file at a given revision.
    ///
    /// Without an explicit repository and ref, the PR's source repository
    /// and source commit are used. Anything other than `200 OK` yields an
    /// empty string.
    ///
    /// # Errors
    /// Returns error if the PR lookup fails or on transport failure.
    pub async fn file_contents(
        &self,
        path: &str,
        repo_slug: Option<&str>,
        git_ref: Option<&str>,
    ) -> Result<String> {
        let (repo_slug, git_ref) = match (repo_slug, git_ref) {
            (Some(slug), Some(git_ref)) => (slug.to_string(), git_ref.to_string()),
            _ => {
                let pr = self.pull_request().await?;
                let slug = pr
                    .source
                    .repository
                    .as_ref()
                    .map_or_else(|| self.repo.repo_slug.clone(), |r| r.full_name.clone());
                (slug, pr.source.commit.hash.clone())
            }
        };

        let url = format!(
            "{}/repositories/{repo_slug}/src/{git_ref}/{path}",
            self.base_url
        );
        let response = self.get_raw(&url).await?;

        if response.status() != StatusCode::OK {
            tracing::debug!(status = %response.status(), path, "file unavailable");
            return Ok(String::new());
        }

        Ok(response.text().await?)
    }

    // === Build Statuses ===

    /// Post a build status on a commit.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn post_build_status(
        &self,
        commit: &str,
        status: &BuildStatus,
    ) -> Result<BuildStatus> {
        self.post(
            &format!("{}/commit/{commit}/statuses/build", self.repo_url()),
            status,
        )
        .await
    }

    // === Comment Operations ===

    /// Post a comment on the selected pull request.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn post_comment(&self, body: &str) -> Result<Comment> {
        let url = format!("{}/comments", self.pr_url()?);
        self.post(&url, &CommentPayload::raw(body)).await
    }

    /// Post a comment on `line` of `path` in the selected pull request.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn post_inline_comment(&self, body: &str, line: u64, path: &str) -> Result<Comment> {
        let url = format!("{}/comments", self.pr_url()?);
        self.post(&url, &CommentPayload::inline(body, line, path))
            .await
    }

    /// Replace the body of a comment.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn update_comment(&self, id: u64, body: &str) -> Result<Comment> {
        let url = format!("{}/comments/{id}", self.pr_url()?);
        self.put(&url, &CommentPayload::raw(body)).await
    }

    /// Delete a comment.
    ///
    /// # Errors
    /// Returns [`Error::CommentDeletion`] if the API does not confirm it.
    pub async fn delete_comment(&self, id: u64) -> Result<()> {
        let url = format!("{}/comments/{id}", self.pr_url()?);
        let response = self.delete(&url).await?;

        if response.status().is_success() {
            return Ok(());
        }

        tracing::debug!(status = %response.status(), id, "comment deletion rejected");
        Err(Error::CommentDeletion(id))
    }
}

impl std::fmt::Debug for BitbucketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketClient")
            .field("base_url", &self.base_url)
            .field("repo", &self.repo)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
