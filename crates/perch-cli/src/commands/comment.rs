//! `perch comment` commands - Post, edit and delete single comments.

use anyhow::{Context, Result, bail};
use console::Term;
use inquire::Confirm;
use perch_bitbucket::Comment;

use super::utils::{self, Session, Target};
use crate::output;

/// Post a comment, inline when `file` and `line` are given.
pub fn run_post(
    target: &Target,
    body: &str,
    file: Option<&str>,
    line: Option<u64>,
    json: bool,
) -> Result<()> {
    let session = Session::pull_request(target)?;

    let comment = match (file, line) {
        (Some(file), Some(line)) => session
            .rt
            .block_on(session.client.post_inline_comment(body, line, file))
            .with_context(|| format!("Failed to comment on {file}:{line}"))?,
        _ => session
            .rt
            .block_on(session.client.post_comment(body))
            .context("Failed to post comment")?,
    };

    report(&comment, "Posted", json)
}

/// Replace the body of comment `id`.
pub fn run_edit(target: &Target, id: u64, body: &str, json: bool) -> Result<()> {
    let session = Session::pull_request(target)?;
    let comment = session
        .rt
        .block_on(session.client.update_comment(id, body))
        .with_context(|| format!("Failed to edit comment {id}"))?;

    report(&comment, "Edited", json)
}

/// Delete comment `id`, asking first unless `yes` is set.
pub fn run_delete(target: &Target, id: u64, yes: bool) -> Result<()> {
    if !yes {
        if !Term::stderr().is_term() {
            bail!("Refusing to delete comment {id} without confirmation (use --yes)");
        }

        let confirmed = Confirm::new(&format!("Delete comment {id}?"))
            .with_default(false)
            .prompt()
            .context("Confirmation cancelled")?;
        if !confirmed {
            output::info("Nothing deleted");
            return Ok(());
        }
    }

    let session = Session::pull_request(target)?;
    session.rt.block_on(session.client.delete_comment(id))?;

    output::success(&format!("Deleted comment {id}"));
    Ok(())
}

fn report(comment: &Comment, verb: &str, json: bool) -> Result<()> {
    if json {
        return utils::print_json(comment);
    }

    output::success(&format!("{verb} comment {}", output::comment_ref(comment.id)));
    if let Some(url) = comment.html_url() {
        output::essential(url);
    }
    Ok(())
}
