//! `perch comments` command - List comments on the pull request.

use anyhow::Result;
use colored::Colorize;
use perch_bitbucket::Comment;
use perch_core::{MarkerId, ownership};

use super::utils::{self, Session, Target};
use crate::output;

/// Run the comments command.
pub fn run(target: &Target, owned: bool, id: Option<&str>, json: bool) -> Result<()> {
    let session = Session::pull_request(target)?;
    let id = match id {
        Some(id) => MarkerId::new(id)?,
        None => session.config.marker_id(),
    };

    let comments = session.rt.block_on(async {
        let comments = session.client.comments().await?;
        if !owned {
            return anyhow::Ok(comments);
        }
        let uuid = session.client.account_uuid().await;
        Ok(comments
            .into_iter()
            .filter(|c| ownership::is_owned(c, &id, uuid))
            .collect())
    })?;

    if json {
        return utils::print_json(&comments);
    }

    if comments.is_empty() {
        output::info("No comments");
        return Ok(());
    }

    for comment in &comments {
        print_comment(comment);
    }

    Ok(())
}

fn print_comment(comment: &Comment) {
    let location = comment.inline.as_ref().map_or_else(String::new, |anchor| {
        let line = anchor.line().map_or_else(String::new, |l| format!(":{l}"));
        format!(" {}{line}", anchor.path).cyan().to_string()
    });

    println!(
        "{} {}{location}",
        output::comment_ref(comment.id),
        comment.user.display_name.bold()
    );
    for line in comment.body().trim().lines() {
        println!("  {line}");
    }
    println!();
}
