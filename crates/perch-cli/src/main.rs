//! Perch CLI - review automation for Bitbucket Cloud pull requests.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::utils::Target;
use commands::{Cli, Commands, CommentCommand};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "PERCH_LOG";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("perch=debug,perch_bitbucket=debug,perch_core=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let Cli {
        repo,
        pr,
        json,
        quiet,
        verbose,
        command,
    } = Cli::parse();

    output::set_quiet(quiet);
    init_tracing(verbose);

    let target = Target { repo, pr };

    let result = match command {
        Commands::Pr => commands::pr::run(&target, json),
        Commands::Prs { branch } => commands::pr::run_list(&target, branch.as_deref(), json),
        Commands::Commits => commands::commits::run(&target, json),
        Commands::Diff => commands::diff::run(&target),
        Commands::Comments { owned, id } => {
            commands::comments::run(&target, owned, id.as_deref(), json)
        }
        Commands::Activity => commands::activity::run(&target, json),
        Commands::File { path, git_ref } => {
            commands::file::run(&target, &path, git_ref.as_deref())
        }
        Commands::Comment { action } => match action {
            CommentCommand::Post { body, file, line } => {
                commands::comment::run_post(&target, &body, file.as_deref(), line, json)
            }
            CommentCommand::Edit { id, body } => {
                commands::comment::run_edit(&target, id, &body, json)
            }
            CommentCommand::Delete { id, yes } => commands::comment::run_delete(&target, id, yes),
        },
        Commands::Status {
            state,
            description,
            url,
        } => commands::status::run(&target, state, description.as_deref(), url.as_deref()),
        Commands::Publish { results, commit } => {
            commands::publish::run(&target, &results, commit.as_deref(), json)
        }
        Commands::Doctor => commands::doctor::run(&target, json),
        Commands::Completions { shell } => {
            commands::completions::run(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
