//! Review results produced by a run and published to a pull request.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::marker::Location;

/// How serious a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Fails the build.
    Fail,
    /// Worth a look, does not fail the build.
    Warning,
    /// Informational.
    Message,
    /// Free-form markdown appended to the comment.
    Markdown,
}

impl Severity {
    /// Emoji shortcode shown next to violations of this severity.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Fail => ":no_entry_sign:",
            Self::Warning => ":warning:",
            Self::Message => ":book:",
            Self::Markdown => "",
        }
    }

    /// Section heading in the main comment.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Fail => "Fails",
            Self::Warning => "Warnings",
            Self::Message => "Messages",
            Self::Markdown => "Markdowns",
        }
    }
}

/// A single reported item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Markdown text.
    pub message: String,

    /// File the item refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Line in `file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
}

impl Violation {
    /// A violation that is not tied to a file.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            line: None,
        }
    }

    /// A violation on `line` of `file`.
    #[must_use]
    pub fn at(message: impl Into<String>, file: impl Into<String>, line: u64) -> Self {
        Self {
            message: message.into(),
            file: Some(file.into()),
            line: Some(line),
        }
    }

    /// Where this violation should be commented inline, if anywhere.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        match (&self.file, self.line) {
            (Some(path), Some(line)) => Some(Location {
                path: path.clone(),
                line,
            }),
            _ => None,
        }
    }
}

/// Everything one run reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Results {
    /// Build-failing items.
    pub fails: Vec<Violation>,
    /// Warnings.
    pub warnings: Vec<Violation>,
    /// Informational messages.
    pub messages: Vec<Violation>,
    /// Free-form markdown.
    pub markdowns: Vec<Violation>,
}

impl Results {
    /// Decode results from JSON.
    ///
    /// # Errors
    /// Returns error if the JSON does not describe results.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read results from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or decoded.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Whether nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fails.is_empty()
            && self.warnings.is_empty()
            && self.messages.is_empty()
            && self.markdowns.is_empty()
    }

    /// Whether the run passes (no fails).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.fails.is_empty()
    }

    /// Violations of one severity.
    #[must_use]
    pub fn of(&self, severity: Severity) -> &[Violation] {
        match severity {
            Severity::Fail => &self.fails,
            Severity::Warning => &self.warnings,
            Severity::Message => &self.messages,
            Severity::Markdown => &self.markdowns,
        }
    }

    fn of_mut(&mut self, severity: Severity) -> &mut Vec<Violation> {
        match severity {
            Severity::Fail => &mut self.fails,
            Severity::Warning => &mut self.warnings,
            Severity::Message => &mut self.messages,
            Severity::Markdown => &mut self.markdowns,
        }
    }

    /// Every violation with its severity, most severe first.
    pub fn iter(&self) -> impl Iterator<Item = (Severity, &Violation)> {
        [
            Severity::Fail,
            Severity::Warning,
            Severity::Message,
            Severity::Markdown,
        ]
        .into_iter()
        .flat_map(move |severity| self.of(severity).iter().map(move |v| (severity, v)))
    }

    /// The violations that belong in the main comment.
    ///
    /// Markdowns always go there; other items only when they have no
    /// file location.
    #[must_use]
    pub fn main_results(&self) -> Self {
        let mut main = Self::default();
        for (severity, violation) in self.iter() {
            if severity == Severity::Markdown || violation.location().is_none() {
                main.of_mut(severity).push(violation.clone());
            }
        }
        main
    }

    /// The located violations, grouped by file and line.
    #[must_use]
    pub fn inline_groups(&self) -> BTreeMap<Location, Self> {
        let mut groups: BTreeMap<Location, Self> = BTreeMap::new();
        for (severity, violation) in self.iter() {
            if severity == Severity::Markdown {
                continue;
            }
            if let Some(location) = violation.location() {
                groups
                    .entry(location)
                    .or_default()
                    .of_mut(severity)
                    .push(violation.clone());
            }
        }
        groups
    }
}
