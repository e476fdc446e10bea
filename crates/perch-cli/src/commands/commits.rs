//! `perch commits` command - List the pull request's commits.

use anyhow::Result;

use super::utils::{self, Session, Target};
use crate::output;

/// Run the commits command.
pub fn run(target: &Target, json: bool) -> Result<()> {
    let session = Session::pull_request(target)?;
    let commits = session.rt.block_on(session.client.commits())?;

    if json {
        return utils::print_json(commits);
    }

    if commits.is_empty() {
        output::warn("Pull request has no commits");
        return Ok(());
    }

    for commit in commits {
        let summary = commit.message.lines().next().unwrap_or("").trim();
        let author = commit
            .author
            .user
            .as_ref()
            .map_or(commit.author.raw.as_str(), |u| u.display_name.as_str());

        output::essential(&format!(
            "{:<10} {summary}     {author}",
            output::short_hash(&commit.hash)
        ));
    }

    Ok(())
}
