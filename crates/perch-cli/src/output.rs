//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use perch_bitbucket::{BuildState, PullRequestState};

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like comment URLs.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Colored label for a pull request state.
#[must_use]
pub fn pr_state(state: PullRequestState) -> String {
    match state {
        PullRequestState::Open => "open".green().to_string(),
        PullRequestState::Merged => "merged".magenta().to_string(),
        PullRequestState::Declined => "declined".red().to_string(),
        PullRequestState::Superseded => "superseded".dimmed().to_string(),
    }
}

/// Colored label for a build state.
#[must_use]
pub fn build_state(state: BuildState) -> String {
    match state {
        BuildState::InProgress => "in progress".yellow().to_string(),
        BuildState::Successful => "successful".green().to_string(),
        BuildState::Failed => "failed".red().to_string(),
        BuildState::Stopped => "stopped".dimmed().to_string(),
    }
}

/// Short form of a commit hash.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

/// Format a comment reference.
#[must_use]
pub fn comment_ref(id: u64) -> String {
    format!("#{id}").dimmed().to_string()
}

/// Print a horizontal line (suppressed in quiet mode).
pub fn hr() {
    if !is_quiet() {
        println!("{}", "─".repeat(50).dimmed());
    }
}
