//! `perch file` command - Print a file from the pull request.

use anyhow::{Result, bail};

use super::utils::{Session, Target};

/// Run the file command.
///
/// With `--ref` the file is read from the selected repository at that
/// ref; otherwise from the PR's source repository and commit.
pub fn run(target: &Target, path: &str, git_ref: Option<&str>) -> Result<()> {
    let session = if git_ref.is_some() {
        Session::repository(target)?
    } else {
        Session::pull_request(target)?
    };

    let slug = git_ref.map(|_| session.client.repo().repo_slug.as_str());
    let contents = session
        .rt
        .block_on(session.client.file_contents(path, slug, git_ref))?;

    if contents.is_empty() {
        bail!("'{path}' is empty or not found");
    }

    print!("{contents}");
    Ok(())
}
