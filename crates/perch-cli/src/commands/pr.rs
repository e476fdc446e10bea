//! `perch pr` and `perch prs` commands - Show pull requests.

use anyhow::Result;
use colored::Colorize;
use perch_bitbucket::PullRequest;

use super::utils::{self, Session, Target};
use crate::output;

/// Show the selected pull request.
pub fn run(target: &Target, json: bool) -> Result<()> {
    let session = Session::pull_request(target)?;
    let pr = session.rt.block_on(session.client.pull_request())?;

    if json {
        return utils::print_json(pr);
    }

    print_pull_request(pr);
    Ok(())
}

/// List pull requests whose source is `branch` (or the current branch).
pub fn run_list(target: &Target, branch: Option<&str>, json: bool) -> Result<()> {
    let branch = match branch {
        Some(branch) => branch.to_string(),
        None => utils::current_branch()?,
    };

    let session = Session::repository(target)?;
    let prs = session
        .rt
        .block_on(session.client.pull_requests_for_branch(&branch))?;

    if json {
        return utils::print_json(&prs);
    }

    if prs.is_empty() {
        output::info(&format!("No pull requests from '{branch}'"));
        return Ok(());
    }

    for pr in &prs {
        output::essential(&format!(
            "#{:<6} {:<12} {}",
            pr.id,
            output::pr_state(pr.state),
            pr.title
        ));
    }

    Ok(())
}

fn print_pull_request(pr: &PullRequest) {
    println!(
        "{} {} {}",
        format!("#{}", pr.id).bold(),
        pr.title.bold(),
        output::pr_state(pr.state)
    );
    println!(
        "  {} → {}  by {}",
        pr.source.branch.name.cyan(),
        pr.destination.branch.name.cyan(),
        pr.author.display_name
    );
    println!("  source commit {}", output::short_hash(&pr.source.commit.hash));

    if let Some(url) = pr.html_url() {
        println!("  {}", url.dimmed());
    }

    if let Some(description) = pr.description.as_deref().filter(|d| !d.trim().is_empty()) {
        output::hr();
        println!("{}", description.trim_end());
    }
}
