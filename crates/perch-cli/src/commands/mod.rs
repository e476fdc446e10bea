//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use perch_bitbucket::BuildState;

pub mod activity;
pub mod comment;
pub mod comments;
pub mod commits;
pub mod completions;
pub mod diff;
pub mod doctor;
pub mod file;
pub mod pr;
pub mod publish;
pub mod status;
pub mod utils;

/// Perch - review automation for Bitbucket Cloud pull requests.
///
/// Reads pull request data and keeps Perch's own comments and build
/// statuses up to date. Credentials come from the BITBUCKET_* environment
/// variables.
#[derive(Parser)]
#[command(name = "perch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Repository as `workspace/repo` (defaults to the origin remote).
    #[arg(long, global = true)]
    pub repo: Option<String>,

    /// Pull request id (defaults to the open PR of the current branch).
    #[arg(long, global = true)]
    pub pr: Option<u64>,

    /// Output as JSON (for tooling integration).
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress informational output.
    ///
    /// Only errors and essential results (like comment URLs) are printed.
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Log requests and decisions to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show the pull request.
    Pr,

    /// List pull requests opened from a branch.
    Prs {
        /// Source branch (defaults to the current branch).
        #[arg(long, short)]
        branch: Option<String>,
    },

    /// List the pull request's commits.
    Commits,

    /// Print the pull request's diff.
    Diff,

    /// List comments on the pull request.
    #[command(alias = "cs")]
    Comments {
        /// Only comments Perch wrote under the marker id.
        #[arg(long)]
        owned: bool,

        /// Marker id (defaults to the configured one).
        #[arg(long)]
        id: Option<String>,
    },

    /// Show the pull request's activity stream.
    Activity,

    /// Print a file from the pull request's source.
    File {
        /// Path inside the repository.
        path: String,

        /// Commit or branch to read from (defaults to the PR source commit).
        #[arg(long = "ref")]
        git_ref: Option<String>,
    },

    /// Write, edit or delete a single comment.
    #[command(alias = "c")]
    Comment {
        #[command(subcommand)]
        action: CommentCommand,
    },

    /// Set the build status on the pull request's source commit.
    #[command(alias = "st")]
    Status {
        /// One of: inprogress, successful, failed, stopped.
        state: BuildState,

        /// Status description.
        #[arg(long, short)]
        description: Option<String>,

        /// Link shown with the status (defaults to the configured one).
        #[arg(long)]
        url: Option<String>,
    },

    /// Publish a results file as comments and a build status.
    ///
    /// Updates Perch's existing comments in place, deletes those that no
    /// longer apply and posts the rest.
    Publish {
        /// JSON file with `fails`, `warnings`, `messages` and `markdowns`.
        results: PathBuf,

        /// Commit named in the comment and given the status (defaults to
        /// the PR source commit).
        #[arg(long)]
        commit: Option<String>,
    },

    /// Check credentials, configuration and connectivity.
    #[command(alias = "doc")]
    Doctor,

    /// Generate shell completions.
    ///
    /// Outputs completion script to stdout. Redirect to a file and
    /// source it in your shell configuration.
    #[command(alias = "comp")]
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Single-comment operations.
#[derive(Subcommand)]
pub enum CommentCommand {
    /// Post a comment, optionally on a file line.
    Post {
        /// Markdown body.
        body: String,

        /// File to comment on.
        #[arg(long, requires = "line")]
        file: Option<String>,

        /// Line in `--file`.
        #[arg(long, requires = "file")]
        line: Option<u64>,
    },

    /// Replace a comment's body.
    Edit {
        /// Comment id.
        id: u64,

        /// New markdown body.
        body: String,
    },

    /// Delete a comment.
    Delete {
        /// Comment id.
        id: u64,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}
