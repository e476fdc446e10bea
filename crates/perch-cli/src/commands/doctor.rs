//! `perch doctor` command - Diagnose credentials, configuration and connectivity.

use anyhow::Result;
use colored::Colorize;
use perch_bitbucket::{BitbucketClient, Credentials, PullRequestState, RepoMetadata};
use perch_core::Config;
use perch_git::Repository;
use serde::Serialize;
use tokio::runtime::Runtime;

use super::utils::{self, Target};
use crate::output;

/// Diagnostic issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Severity {
    Error,
    Warning,
}

/// A diagnostic issue found by the doctor.
#[derive(Debug, Clone, Serialize)]
struct Issue {
    severity: Severity,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

/// JSON output for doctor command.
#[derive(Debug, Serialize)]
struct DoctorOutput {
    healthy: bool,
    errors: usize,
    warnings: usize,
    issues: Vec<Issue>,
}

impl Issue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            suggestion: None,
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            suggestion: None,
        }
    }

    fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// What the local checks found, for the API check to use.
#[derive(Default)]
struct Findings {
    credentials: Option<Credentials>,
    config: Config,
    slug: Option<String>,
    branch: Option<String>,
    head: Option<String>,
}

/// Run the doctor command.
pub fn run(target: &Target, json: bool) -> Result<()> {
    let mut issues: Vec<Issue> = Vec::new();
    let mut findings = Findings::default();

    section("Checking credentials...", json, &mut issues, |issues| {
        check_credentials(&mut findings, issues);
    });
    section("Checking configuration...", json, &mut issues, |issues| {
        check_config(&mut findings, issues);
    });
    section("Checking repository...", json, &mut issues, |issues| {
        check_repository(target, &mut findings, issues);
    });
    section("Checking Bitbucket...", json, &mut issues, |issues| {
        check_bitbucket(target, &findings, issues, tokio::runtime::Runtime::new);
    });

    if json {
        return output_json(&issues);
    }

    println!();
    print_issues(&issues);
    print_summary(&issues);

    Ok(())
}

/// Run one group of checks, printing its outcome unless `json` is set.
fn section(title: &str, json: bool, issues: &mut Vec<Issue>, check: impl FnOnce(&mut Vec<Issue>)) {
    if !json {
        print_check(title);
    }
    let before = issues.len();
    check(issues);
    if !json {
        print_status(&issues[before..]);
    }
}

/// Output issues as JSON.
fn output_json(issues: &[Issue]) -> Result<()> {
    let (errors, warnings) = count(issues);

    let output = DoctorOutput {
        healthy: errors == 0 && warnings == 0,
        errors,
        warnings,
        issues: issues.to_vec(),
    };

    utils::print_json(&output)
}

fn count(issues: &[Issue]) -> (usize, usize) {
    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    (errors, issues.len() - errors)
}

fn print_check(message: &str) {
    print!("  {message}");
}

fn print_status(issues: &[Issue]) {
    match count(issues) {
        (0, 0) => println!(" {}", "✓".green()),
        (0, _) => println!(" {}", "⚠".yellow()),
        _ => println!(" {}", "✗".red()),
    }
}

fn print_issues(issues: &[Issue]) {
    if issues.is_empty() {
        return;
    }

    for issue in issues {
        let icon = match issue.severity {
            Severity::Error => "✗".red(),
            Severity::Warning => "⚠".yellow(),
        };

        println!("  {icon} {}", issue.message);

        if let Some(suggestion) = &issue.suggestion {
            println!("    {} {suggestion}", "→".dimmed());
        }
    }
    println!();
}

fn print_summary(issues: &[Issue]) {
    let (errors, warnings) = count(issues);

    if errors == 0 && warnings == 0 {
        output::success("No issues found!");
    } else {
        let summary = format!(
            "Found {} issue(s) ({errors} error(s), {warnings} warning(s))",
            errors + warnings
        );
        if errors > 0 {
            output::error(&summary);
        } else {
            output::warn(&summary);
        }
    }
    println!();
}

fn check_credentials(findings: &mut Findings, issues: &mut Vec<Issue>) {
    match Credentials::from_env() {
        Ok(credentials) => {
            if credentials.uuid().is_none() {
                issues.push(
                    Issue::warning("BITBUCKET_UUID is not set")
                        .with_suggestion("Set it to skip the account lookup on every run"),
                );
            }
            findings.credentials = Some(credentials);
        }
        Err(e) => issues.push(Issue::error(e.to_string()).with_suggestion(
            "Set BITBUCKET_OAUTH_KEY/SECRET, BITBUCKET_USERNAME/PASSWORD or BITBUCKET_ACCESS_TOKEN",
        )),
    }
}

fn check_config(findings: &mut Findings, issues: &mut Vec<Issue>) {
    match utils::load_config() {
        Ok(config) => findings.config = config,
        Err(e) => issues.push(
            Issue::error(format!("{e:#}")).with_suggestion("Fix or remove the config file"),
        ),
    }
}

fn check_repository(target: &Target, findings: &mut Findings, issues: &mut Vec<Issue>) {
    let Ok(repo) = Repository::open_current() else {
        if target.repo.is_none() {
            issues.push(
                Issue::error("Not inside a git repository")
                    .with_suggestion("Run inside a checkout or pass --repo and --pr"),
            );
        }
        findings.slug.clone_from(&target.repo);
        return;
    };

    match (&target.repo, repo.origin_slug()) {
        (Some(slug), _) => findings.slug = Some(slug.clone()),
        (None, Ok(slug)) => findings.slug = Some(slug),
        (None, Err(e)) => issues.push(
            Issue::error(format!("Origin is not a Bitbucket repository: {e}"))
                .with_suggestion("Pass --repo workspace/repo"),
        ),
    }

    findings.head = repo.head_commit().ok().map(|oid| oid.to_string());

    match repo.current_branch() {
        Ok(branch) => findings.branch = Some(branch),
        Err(_) if target.pr.is_none() => issues.push(
            Issue::warning("HEAD is detached (not on a branch)")
                .with_suggestion("Pass --pr to select the pull request"),
        ),
        Err(_) => {}
    }
}

fn check_bitbucket(
    target: &Target,
    findings: &Findings,
    issues: &mut Vec<Issue>,
    runtime: impl FnOnce() -> std::io::Result<Runtime>,
) {
    let (Some(credentials), Some(slug)) = (&findings.credentials, &findings.slug) else {
        issues.push(Issue::warning("Skipped: credentials or repository missing"));
        return;
    };

    let base_url = findings
        .config
        .api_url
        .as_deref()
        .unwrap_or(BitbucketClient::DEFAULT_API_URL);
    let repo = RepoMetadata::repository(slug);
    let Ok(client) = BitbucketClient::with_base_url(repo, credentials.clone(), base_url) else {
        issues.push(Issue::error("Could not build the HTTP client"));
        return;
    };

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            issues.push(Issue::error(format!("Could not start the async runtime: {e}")));
            return;
        }
    };

    let pr_id = rt.block_on(async {
        if let Err(e) = client.current_user().await {
            issues.push(
                Issue::error(format!("Bitbucket rejected the credentials: {e}"))
                    .with_suggestion("Check the BITBUCKET_* environment variables"),
            );
            return None;
        }

        if target.pr.is_some() {
            return target.pr;
        }
        let branch = findings.branch.as_ref()?;

        match client.pull_requests_for_branch(branch).await {
            Ok(prs) => {
                let open: Vec<u64> = prs
                    .iter()
                    .filter(|pr| pr.state == PullRequestState::Open)
                    .map(|pr| pr.id)
                    .collect();
                if let [id] = open.as_slice() {
                    return Some(*id);
                }
                issues.push(
                    Issue::warning(format!(
                        "{} open pull request(s) for branch '{branch}'",
                        open.len()
                    ))
                    .with_suggestion("Pass --pr to select the pull request"),
                );
                None
            }
            Err(e) => {
                issues.push(Issue::warning(format!(
                    "Could not list pull requests for '{slug}': {e}"
                )));
                None
            }
        }
    });

    let Some(id) = pr_id else {
        return;
    };
    let client = client.with_pull_request(id);

    match rt.block_on(client.pull_request()) {
        Ok(pr) => {
            if pr.state != PullRequestState::Open {
                issues.push(Issue::warning(format!(
                    "Pull request #{id} is {:?} (not open)",
                    pr.state
                )));
            }
            let source = &pr.source.commit.hash;
            if let Some(head) = &findings.head {
                if !head.starts_with(source.as_str()) {
                    issues.push(
                        Issue::warning(format!(
                            "Local HEAD {} is not the PR source commit {}",
                            output::short_hash(head),
                            output::short_hash(source)
                        ))
                        .with_suggestion("Push your branch before publishing"),
                    );
                }
            }
        }
        Err(e) => issues.push(Issue::error(format!("Could not fetch pull request #{id}: {e}"))),
    }
}
