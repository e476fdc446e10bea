use anyhow::{Context, Result, bail};
use perch_bitbucket::{BitbucketClient, Credentials, PullRequestState, RepoMetadata};
use perch_core::Config;
use perch_git::Repository;
use serde::Serialize;
use tokio::runtime::Runtime;

/// Repository and pull request picked with `--repo` and `--pr`.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub repo: Option<String>,
    pub pr: Option<u64>,
}

/// A runtime plus a client for the selected repository.
pub struct Session {
    pub rt: Runtime,
    pub client: BitbucketClient,
    pub config: Config,
}

impl Session {
    /// Connect to the repository without selecting a pull request.
    pub fn repository(target: &Target) -> Result<Self> {
        let config = load_config()?;
        let credentials = Credentials::from_env().context("Bitbucket credentials not configured")?;
        let slug = repo_slug(target)?;

        let base_url = config
            .api_url
            .as_deref()
            .unwrap_or(BitbucketClient::DEFAULT_API_URL);
        let client =
            BitbucketClient::with_base_url(RepoMetadata::repository(slug), credentials, base_url)?;
        let rt = Runtime::new()?;

        Ok(Self { rt, client, config })
    }

    /// Connect to the repository and select the pull request.
    ///
    /// Without `--pr`, the single open pull request whose source branch is
    /// the current branch is used.
    pub fn pull_request(target: &Target) -> Result<Self> {
        let Self { rt, client, config } = Self::repository(target)?;

        let id = match target.pr {
            Some(id) => id,
            None => {
                let branch = current_branch()?;
                rt.block_on(find_open_pull_request(&client, &branch))?
            }
        };
        tracing::debug!(id, "selected pull request");

        Ok(Self {
            rt,
            client: client.with_pull_request(id),
            config,
        })
    }
}

/// Load `perch.toml` for the working directory.
pub fn load_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("Cannot read the working directory")?;
    Ok(Config::load(&cwd)?)
}

/// `--repo`, or the Bitbucket repository behind `origin`.
pub fn repo_slug(target: &Target) -> Result<String> {
    if let Some(slug) = &target.repo {
        return Ok(slug.clone());
    }

    let repo = Repository::open_current().context("Not inside a git repository (use --repo)")?;
    repo.origin_slug()
        .context("Could not read a Bitbucket repository from the origin remote (use --repo)")
}

/// Name of the checked-out branch.
pub fn current_branch() -> Result<String> {
    let repo = Repository::open_current().context("Not inside a git repository (use --pr)")?;
    repo.current_branch()
        .context("Cannot tell which pull request to use (use --pr)")
}

async fn find_open_pull_request(client: &BitbucketClient, branch: &str) -> Result<u64> {
    let open: Vec<u64> = client
        .pull_requests_for_branch(branch)
        .await?
        .into_iter()
        .filter(|pr| pr.state == PullRequestState::Open)
        .map(|pr| pr.id)
        .collect();

    match open.as_slice() {
        [id] => Ok(*id),
        [] => bail!("No open pull request for branch '{branch}' (use --pr)"),
        ids => bail!(
            "{} open pull requests for branch '{branch}' (use --pr)",
            ids.len()
        ),
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
