//! Markdown bodies for the comments and build status Perch posts.

use std::fmt::Write;

use crate::results::{Results, Severity};

const LISTED: [Severity; 3] = [Severity::Fail, Severity::Warning, Severity::Message];

/// Body of the main comment, without marker or signature.
///
/// `inline_count` is the number of items posted as inline comments and is
/// mentioned so readers know to look at the diff.
#[must_use]
pub fn main_comment(results: &Results, inline_count: usize) -> String {
    let mut body = String::new();

    for severity in LISTED {
        let items = results.of(severity);
        if items.is_empty() {
            continue;
        }

        let _ = writeln!(body, "**{} {}**\n", severity.emoji(), severity.heading());
        for item in items {
            let _ = writeln!(body, "- {}", item.message);
        }
        body.push('\n');
    }

    if inline_count > 0 {
        let _ = writeln!(
            body,
            ":speech_balloon: {inline_count} item(s) are commented inline on the diff.\n"
        );
    }

    for markdown in &results.markdowns {
        let _ = writeln!(body, "{}\n", markdown.message);
    }

    if body.is_empty() {
        body.push_str(":white_check_mark: All green.\n");
    }

    body
}

/// Body of an inline comment, without marker.
#[must_use]
pub fn inline_comment(results: &Results) -> String {
    let mut body = String::new();
    for (severity, item) in results.iter() {
        if severity == Severity::Markdown {
            continue;
        }
        let _ = writeln!(body, "- {} {}", severity.emoji(), item.message);
    }
    body
}

/// One-line summary for the build status description.
#[must_use]
pub fn status_description(results: &Results) -> String {
    let counts: Vec<String> = LISTED
        .iter()
        .filter_map(|&severity| {
            let n = results.of(severity).len();
            (n > 0).then(|| format!("{n} {}", severity.heading().to_lowercase()))
        })
        .collect();

    if counts.is_empty() {
        "All green.".to_string()
    } else {
        format!("Found {}.", counts.join(", "))
    }
}
