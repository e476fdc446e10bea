//! `perch publish` command - Publish a results file to the pull request.

use std::path::Path;

use anyhow::{Context, Result};
use perch_core::{PublishSummary, Publisher, Results};

use super::utils::{self, Session, Target};
use crate::output;

/// Run the publish command.
pub fn run(target: &Target, path: &Path, commit: Option<&str>, json: bool) -> Result<()> {
    let results = Results::load(path)
        .with_context(|| format!("Could not read results from {}", path.display()))?;

    let session = Session::pull_request(target)?;
    let publisher = Publisher::new(&session.client, &session.config);

    if !json {
        output::info(&format!(
            "Publishing under marker id '{}'...",
            publisher.marker_id()
        ));
    }
    let summary = session.rt.block_on(publisher.publish(&results, commit))?;

    if json {
        return utils::print_json(&summary);
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &PublishSummary) {
    let inline_total = summary.inline_created + summary.inline_updated + summary.inline_unchanged;
    if inline_total > 0 || summary.inline_deleted > 0 {
        output::info(&format!(
            "Inline comments: {} created, {} updated, {} unchanged, {} deleted",
            summary.inline_created,
            summary.inline_updated,
            summary.inline_unchanged,
            summary.inline_deleted
        ));
    }

    if summary.main_comment_deleted {
        output::info("Nothing to report; removed the previous comment");
    }

    if !summary.status_posted {
        output::warn("Build status was not posted");
    }

    output::success("Published");
    if let Some(url) = &summary.main_comment_url {
        output::essential(url);
    }
}
