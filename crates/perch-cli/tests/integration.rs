//! Integration tests for the perch CLI.
//!
//! Most tests cover argument handling and everything that fails before
//! the first request. The Bitbucket section points `api_url` at a mock
//! server.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::process::Command as StdCommand;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CREDENTIAL_VARS: [&str; 7] = [
    "BITBUCKET_OAUTH_KEY",
    "BITBUCKET_OAUTH_SECRET",
    "BITBUCKET_USERNAME",
    "BITBUCKET_PASSWORD",
    "BITBUCKET_ACCESS_TOKEN",
    "BITBUCKET_UUID",
    "PERCH_LOG",
];

/// Helper to create a git repository in a temp directory.
fn setup_git_repo() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let git = |args: &[&str]| {
        StdCommand::new("git")
            .args(args)
            .current_dir(&temp)
            .output()
            .expect("Failed to run git");
    };

    git(&["init"]);
    git(&["config", "user.email", "test@example.com"]);
    git(&["config", "user.name", "Test User"]);

    fs::write(temp.path().join("README.md"), "# Test Repo\n").expect("Failed to write README");
    git(&["add", "."]);
    git(&["commit", "-m", "Initial commit"]);
    git(&["branch", "-M", "main"]);

    temp
}

/// Helper to get the perch command with a clean environment.
fn perch(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_perch"));
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd.env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .current_dir(dir);
    cmd
}

// ============================================================================
// Basic CLI tests
// ============================================================================

#[test]
fn test_version_flag() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("perch"));
}

#[test]
fn test_help_flag() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bitbucket"))
        .stdout(predicate::str::contains("comments"))
        .stdout(predicate::str::contains("publish"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn test_no_subcommand_shows_help() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_completions() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("perch"));
}

// ============================================================================
// Argument validation
// ============================================================================

#[test]
fn test_status_rejects_unknown_state() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .args(["status", "maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("maybe"));
}

#[test]
fn test_inline_comment_needs_line() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .args(["comment", "post", "hi", "--file", "src/lib.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--line"));
}

#[test]
fn test_quiet_conflicts_with_json() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .args(["--quiet", "--json", "pr"])
        .assert()
        .failure();
}

// ============================================================================
// Failures before any request
// ============================================================================

#[test]
fn test_missing_credentials() {
    let temp = setup_git_repo();
    perch(&temp)
        .args(["--repo", "foo/bar", "--pr", "1", "pr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("credentials"));
}

#[test]
fn test_outside_git_repository_needs_repo_flag() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .env("BITBUCKET_ACCESS_TOKEN", "token")
        .arg("pr")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not inside a git repository"));
}

#[test]
fn test_non_bitbucket_origin() {
    let temp = setup_git_repo();
    StdCommand::new("git")
        .args(["remote", "add", "origin", "git@github.com:foo/bar.git"])
        .current_dir(&temp)
        .output()
        .unwrap();

    perch(&temp)
        .env("BITBUCKET_ACCESS_TOKEN", "token")
        .arg("prs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("origin remote"));
}

#[test]
fn test_invalid_config_names_file() {
    let temp = setup_git_repo();
    fs::write(temp.path().join("perch.toml"), "marker_id = [").unwrap();

    perch(&temp)
        .env("BITBUCKET_ACCESS_TOKEN", "token")
        .args(["--repo", "foo/bar", "--pr", "1", "pr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("perch.toml"));
}

#[test]
fn test_publish_missing_results_file() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .args(["publish", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn test_comment_delete_requires_confirmation() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .args(["comment", "delete", "12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

// ============================================================================
// Doctor
// ============================================================================

#[test]
fn test_doctor_json_reports_missing_credentials() {
    let temp = setup_git_repo();
    let output = perch(&temp)
        .args(["doctor", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["healthy"], false);
    assert!(report["errors"].as_u64().unwrap() >= 1);
}

#[test]
fn test_doctor_outside_repository() {
    let temp = TempDir::new().unwrap();
    perch(&temp)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not inside a git repository"));
}

// ============================================================================
// Bitbucket (mock server)
// ============================================================================

const BOT: &str = "{1234-1234-1234-1234}";
const PRS_PATH: &str = "/repositories/foo/bar/pullrequests";

/// A checkout of `foo/bar` on `main` whose config points at `server`.
fn bitbucket_repo(server: &MockServer) -> TempDir {
    let temp = setup_git_repo();
    StdCommand::new("git")
        .args(["remote", "add", "origin", "git@bitbucket.org:foo/bar.git"])
        .current_dir(&temp)
        .output()
        .unwrap();
    fs::write(
        temp.path().join("perch.toml"),
        format!("api_url = \"{}\"\n", server.uri()),
    )
    .unwrap();
    temp
}

/// `perch` with access-token credentials for the bot account.
fn perch_authed(dir: &TempDir) -> Command {
    let mut cmd = perch(dir);
    cmd.env("BITBUCKET_ACCESS_TOKEN", "token")
        .env("BITBUCKET_UUID", BOT);
    cmd
}

fn pull_request(id: u64, state: &str) -> serde_json::Value {
    let href = format!("https://bitbucket.org/foo/bar/pull-requests/{id}");
    json!({
        "id": id,
        "title": format!("Change {id}"),
        "state": state,
        "author": { "uuid": "{author}", "display_name": "Author" },
        "source": { "branch": { "name": "main" }, "commit": { "hash": "a0cd" } },
        "destination": { "branch": { "name": "release" }, "commit": { "hash": "ffff" } },
        "links": { "html": { "href": href } }
    })
}

async fn mount_branch_pull_requests(server: &MockServer, values: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path(PRS_PATH))
        .and(query_param("q", "source.branch.name = \"main\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": values })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_pull_request(server: &MockServer, id: u64, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{PRS_PATH}/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(pull_request(id, "OPEN")))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pr_json_selects_single_open_pull_request() {
    let server = MockServer::start().await;
    mount_branch_pull_requests(&server, vec![pull_request(7, "OPEN")]).await;
    mount_pull_request(&server, 7, 1).await;
    let temp = bitbucket_repo(&server);

    let output = perch_authed(&temp)
        .args(["--json", "pr"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let pr: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(pr["id"], 7);
    assert_eq!(pr["state"], "OPEN");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pr_ignores_merged_pull_requests() {
    let server = MockServer::start().await;
    mount_branch_pull_requests(
        &server,
        vec![pull_request(3, "MERGED"), pull_request(7, "OPEN")],
    )
    .await;
    mount_pull_request(&server, 3, 0).await;
    mount_pull_request(&server, 7, 1).await;
    let temp = bitbucket_repo(&server);

    perch_authed(&temp)
        .arg("pr")
        .assert()
        .success()
        .stdout(predicate::str::contains("#7"))
        .stdout(predicate::str::contains("Change 7"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_open_pull_request_asks_for_pr_flag() {
    let server = MockServer::start().await;
    mount_branch_pull_requests(&server, vec![pull_request(3, "MERGED")]).await;
    let temp = bitbucket_repo(&server);

    perch_authed(&temp)
        .arg("pr")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No open pull request for branch 'main'"))
        .stderr(predicate::str::contains("--pr"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_several_open_pull_requests_are_ambiguous() {
    let server = MockServer::start().await;
    mount_branch_pull_requests(
        &server,
        vec![pull_request(7, "OPEN"), pull_request(8, "OPEN")],
    )
    .await;
    mount_pull_request(&server, 7, 0).await;
    mount_pull_request(&server, 8, 0).await;
    let temp = bitbucket_repo(&server);

    perch_authed(&temp)
        .arg("pr")
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 open pull requests"))
        .stderr(predicate::str::contains("--pr"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_publish_json_reports_summary() {
    let comment_url = "https://bitbucket.org/foo/bar/pull-requests/7#comment-30";
    let server = MockServer::start().await;
    mount_branch_pull_requests(&server, vec![pull_request(7, "OPEN")]).await;
    Mock::given(method("GET"))
        .and(path(format!("{PRS_PATH}/7")))
        .respond_with(ResponseTemplate::new(200).set_body_json(pull_request(7, "OPEN")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{PRS_PATH}/7/comments")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{PRS_PATH}/7/comments")))
        .and(body_string_contains("No changelog"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 30,
            "content": { "raw": "x" },
            "user": { "uuid": BOT, "display_name": "perch" },
            "links": { "html": { "href": comment_url } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repositories/foo/bar/commit/a0cd/statuses/build"))
        .and(body_string_contains("FAILED"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "state": "FAILED",
            "key": "default",
            "name": "Perch",
            "url": "https://github.com/perch-dev/perch",
            "description": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = bitbucket_repo(&server);
    fs::write(
        temp.path().join("results.json"),
        r#"{ "fails": [{ "message": "No changelog" }] }"#,
    )
    .unwrap();

    let output = perch_authed(&temp)
        .args(["--json", "publish", "results.json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["main_comment_url"], comment_url);
    assert_eq!(summary["status_posted"], true);
    assert_eq!(summary["inline_created"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_missing_or_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repositories/foo/bar/src/main/nope.md"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let temp = bitbucket_repo(&server);

    perch_authed(&temp)
        .args(["file", "nope.md", "--ref", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'nope.md' is empty or not found"));
}
