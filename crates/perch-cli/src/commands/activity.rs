//! `perch activity` command - Show the pull request's activity stream.

use anyhow::Result;
use perch_bitbucket::ActivityKind;

use super::utils::{self, Session, Target};
use crate::output;

const fn label(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Update => "update",
        ActivityKind::Approval => "approval",
        ActivityKind::ChangesRequested => "changes requested",
        ActivityKind::Comment => "comment",
        ActivityKind::Other => "other",
    }
}

/// Run the activity command.
pub fn run(target: &Target, json: bool) -> Result<()> {
    let session = Session::pull_request(target)?;
    let activities = session.rt.block_on(session.client.activities())?;

    if json {
        return utils::print_json(&activities);
    }

    if activities.is_empty() {
        output::info("No activity");
        return Ok(());
    }

    for activity in &activities {
        let actor = activity.actor().unwrap_or("unknown");
        output::essential(&format!("{:<18} {actor}", label(activity.kind())));
    }

    Ok(())
}
