//! `perch status` command - Set the build status.

use anyhow::{Result, bail};
use perch_bitbucket::BuildState;
use perch_core::Publisher;

use super::utils::{Session, Target};
use crate::output;

/// Run the status command.
pub fn run(
    target: &Target,
    state: BuildState,
    description: Option<&str>,
    url: Option<&str>,
) -> Result<()> {
    let session = Session::pull_request(target)?;
    let publisher = Publisher::new(&session.client, &session.config);

    let posted = session
        .rt
        .block_on(publisher.update_status(state, description.unwrap_or_default(), url));
    if !posted {
        bail!("Bitbucket rejected the build status (run with -v for details)");
    }

    output::success(&format!(
        "Build status '{}' set to {}",
        session.config.status_key(),
        output::build_state(state)
    ));
    Ok(())
}
