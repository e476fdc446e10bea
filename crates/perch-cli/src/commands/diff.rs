//! `perch diff` command - Print the pull request's diff.

use anyhow::Result;

use super::utils::{Session, Target};
use crate::output;

/// Run the diff command.
pub fn run(target: &Target) -> Result<()> {
    let session = Session::pull_request(target)?;
    let diff = session.rt.block_on(session.client.diff())?;

    if diff.is_empty() {
        output::warn("Diff is empty or unavailable");
        return Ok(());
    }

    print!("{diff}");
    Ok(())
}
