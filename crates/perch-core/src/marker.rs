//! Hidden markers embedded in the comments Perch writes.
//!
//! A marker is a run of markdown link-reference definitions, which
//! Bitbucket does not render:
//!
//! ```text
//! [//]: # (perch-id-default;)
//! [//]: # (  File: src/lib.rs;
//!   Line: 12;)
//! ```
//!
//! The first line names the [`MarkerId`] of the run that wrote the
//! comment; the optional second one records the file location of an
//! inline comment.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Prefix of the id tag inside a marker.
pub const TAG_PREFIX: &str = "perch-id-";

/// Marker id used when none is configured.
pub const DEFAULT_MARKER_ID: &str = "default";

/// Link-reference opener that hides a line from rendered markdown.
const COMMENT_OPEN: &str = "[//]: # (";
const FILE_KEY: &str = "File:";
const LINE_KEY: &str = "Line:";

/// Upper bound for marker ids.
const MAX_MARKER_ID_LENGTH: usize = 100;

/// Identifies one Perch run configuration on a pull request.
///
/// Several independent runs can comment on the same PR as long as they
/// use different ids.
///
/// # Examples
///
/// ```
/// use perch_core::MarkerId;
///
/// let id = MarkerId::new("lint").unwrap();
/// assert_eq!(id.tag(), "perch-id-lint;");
///
/// assert!(MarkerId::new("").is_err());
/// assert!(MarkerId::new("two words").is_err());
/// assert!(MarkerId::new("semi;colon").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerId(String);

impl MarkerId {
    /// Create a new validated marker id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMarkerId`] if the id is empty, too long, or
    /// contains characters that would break the marker syntax.
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        validate_marker_id(&id)?;
        Ok(Self(id))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The tag whose presence in a comment body marks it as written by
    /// this id.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{TAG_PREFIX}{};", self.0)
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self(DEFAULT_MARKER_ID.to_string())
    }
}

impl AsRef<str> for MarkerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MarkerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for MarkerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MarkerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

fn validate_marker_id(id: &str) -> Result<(), Error> {
    let reject = |reason: String| {
        Err(Error::InvalidMarkerId {
            id: id.to_string(),
            reason,
        })
    };

    if id.is_empty() {
        return reject("marker id cannot be empty".to_string());
    }

    if id.chars().count() > MAX_MARKER_ID_LENGTH {
        return reject(format!(
            "marker id cannot be longer than {MAX_MARKER_ID_LENGTH} characters"
        ));
    }

    for c in id.chars() {
        if c.is_whitespace() || c.is_control() {
            return reject("marker id cannot contain whitespace or control characters".to_string());
        }

        // Delimiters of the marker syntax itself
        if matches!(c, ';' | '(' | ')') {
            return reject(format!("marker id cannot contain '{c}'"));
        }
    }

    Ok(())
}

/// File position recorded in an inline comment's marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    /// Path relative to the repository root.
    pub path: String,
    /// 1-based line on the new side of the diff.
    pub line: u64,
}

/// A marker read back from a comment body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Id of the run that wrote the comment.
    pub id: MarkerId,
    /// Recorded position, for inline comments.
    pub location: Option<Location>,
}

/// Signature line closing every main comment.
#[must_use]
pub fn signature(commit: Option<&str>) -> String {
    match commit {
        Some(commit) => format!("Generated by perch against {commit}"),
        None => "Generated by perch".to_string(),
    }
}

fn id_line(id: &MarkerId) -> String {
    format!("{COMMENT_OPEN}{})", id.tag())
}

fn location_line(path: &str, line: u64) -> String {
    format!("{COMMENT_OPEN}  {FILE_KEY} {path};\n  {LINE_KEY} {line};)")
}

/// Render a main comment: marker, body and signature.
#[must_use]
pub fn render_main(id: &MarkerId, body: &str, commit: Option<&str>) -> String {
    format!(
        "{}\n\n{}\n\n{}\n",
        id_line(id),
        body.trim_end(),
        signature(commit)
    )
}

/// Render an inline comment: marker with location, then body.
#[must_use]
pub fn render_inline(id: &MarkerId, path: &str, line: u64, body: &str) -> String {
    format!(
        "{}\n{}\n\n{}\n",
        id_line(id),
        location_line(path, line),
        body.trim_end()
    )
}

/// Read the marker out of a comment body.
///
/// Returns `None` when the body carries no well-formed id. The location is
/// optional and only set when both the file and a numeric line are present.
///
/// # Examples
///
/// ```
/// use perch_core::marker;
///
/// let body = "\n[//]: # (perch-id-lint;)\n[//]: # (  File: a.rs;\n  Line: 5;)\n\n- oops\n";
/// let parsed = marker::parse(body).unwrap();
/// assert_eq!(parsed.id.as_str(), "lint");
/// assert_eq!(parsed.location.unwrap().line, 5);
/// ```
#[must_use]
pub fn parse(body: &str) -> Option<Marker> {
    let comments = hidden_comments(body);

    let id = comments.iter().find_map(|text| {
        let rest = text.trim().strip_prefix(TAG_PREFIX)?;
        let (id, _) = rest.split_once(';')?;
        MarkerId::new(id).ok()
    })?;

    let location = comments.iter().find_map(|text| parse_location(text));

    Some(Marker { id, location })
}

/// Collect the text inside every hidden link-reference comment.
///
/// A comment may continue over several lines until one ends in `)`.
fn hidden_comments(body: &str) -> Vec<String> {
    let mut comments = Vec::new();
    let mut current: Option<String> = None;

    for line in body.lines() {
        let trimmed = line.trim();

        match current.as_mut() {
            Some(text) => {
                text.push('\n');
                text.push_str(trimmed);
            }
            None => match trimmed.strip_prefix(COMMENT_OPEN) {
                Some(rest) => current = Some(rest.to_string()),
                None => continue,
            },
        }

        if let Some(text) = current.take_if(|t| t.ends_with(')')) {
            comments.push(text[..text.len() - 1].to_string());
        }
    }

    comments
}

fn parse_location(text: &str) -> Option<Location> {
    let start = text.find(FILE_KEY)? + FILE_KEY.len();
    let end = start + text[start..].rfind(LINE_KEY)?;

    // Paths may contain `;`, so the path ends at the last one before `Line:`.
    let (path, _) = text[start..end].rsplit_once(';')?;
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    let (line, _) = text[end + LINE_KEY.len()..].split_once(';')?;
    let line = line.trim().parse().ok()?;

    Some(Location {
        path: path.to_string(),
        line,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(s: &str) -> MarkerId {
        MarkerId::new(s).unwrap()
    }

    #[test]
    fn test_valid_ids() {
        for valid in ["default", "1", "lint-rules", "ci.main", "emoji-✨"] {
            assert!(MarkerId::new(valid).is_ok(), "{valid}");
        }
    }

    #[test]
    fn test_invalid_ids() {
        for invalid in ["", "a b", "a;b", "a(b", "a)b", "tab\there", "line\nbreak"] {
            assert!(MarkerId::new(invalid).is_err(), "{invalid:?}");
        }
        assert!(MarkerId::new("x".repeat(MAX_MARKER_ID_LENGTH + 1)).is_err());
        assert!(MarkerId::new("x".repeat(MAX_MARKER_ID_LENGTH)).is_ok());
    }

    #[test]
    fn test_default_id() {
        assert_eq!(MarkerId::default().as_str(), DEFAULT_MARKER_ID);
        assert_eq!(MarkerId::default().tag(), "perch-id-default;");
    }

    #[test]
    fn test_serde_validates() {
        let parsed: MarkerId = serde_json::from_str("\"lint\"").unwrap();
        assert_eq!(parsed, id("lint"));
        assert!(serde_json::from_str::<MarkerId>("\"bad id\"").is_err());
    }

    #[test]
    fn test_render_main() {
        let body = render_main(&id("1"), "- :warning: Hello\n\n", Some("e70f3d6"));
        assert_eq!(
            body,
            "[//]: # (perch-id-1;)\n\n- :warning: Hello\n\nGenerated by perch against e70f3d6\n"
        );
        assert!(body.contains(&id("1").tag()));
    }

    #[test]
    fn test_render_inline() {
        let body = render_inline(&id("1"), "dangerfile.ts", 5, "- :warning: Hello updates");
        assert_eq!(
            body,
            "[//]: # (perch-id-1;)\n[//]: # (  File: dangerfile.ts;\n  Line: 5;)\n\n- :warning: Hello updates\n"
        );
    }

    #[test]
    fn test_parse_rendered_inline() {
        let body = render_inline(&id("lint"), "src/main.rs", 42, "body");
        let marker = parse(&body).unwrap();
        assert_eq!(marker.id, id("lint"));
        assert_eq!(
            marker.location,
            Some(Location {
                path: "src/main.rs".into(),
                line: 42
            })
        );
    }

    #[test]
    fn test_parse_path_with_semicolon() {
        let body = render_inline(&id("1"), "docs/a;b.md", 7, "x");
        let marker = parse(&body).unwrap();
        assert_eq!(
            marker.location,
            Some(Location {
                path: "docs/a;b.md".into(),
                line: 7
            })
        );
    }

    #[test]
    fn test_parse_main_has_no_location() {
        let marker = parse(&render_main(&id("1"), "body", None)).unwrap();
        assert_eq!(marker.id, id("1"));
        assert!(marker.location.is_none());
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let body =
            "\n[//]: # (perch-id-1;)\n   [//]: # (  File: dangerfile.ts;\n  Line: 5;)\n\n- :warning: Hello updates\n\n\n  ";
        let marker = parse(body).unwrap();
        assert_eq!(marker.id, id("1"));
        assert_eq!(marker.location.unwrap().path, "dangerfile.ts");
    }

    #[test]
    fn test_parse_ignores_unmarked_bodies() {
        assert!(parse("not a perch comment").is_none());
        assert!(parse("mentions perch-id-1; in prose").is_none());
        assert!(parse("[//]: # (something else)").is_none());
    }

    #[test]
    fn test_parse_bad_line_drops_location() {
        let body = "[//]: # (perch-id-1;)\n[//]: # (  File: a.rs;\n  Line: five;)\n";
        let marker = parse(body).unwrap();
        assert!(marker.location.is_none());
    }

    #[test]
    fn test_parse_unterminated_comment() {
        assert!(parse("[//]: # (perch-id-1;\nno closing paren").is_none());
    }

    #[test]
    fn test_signature() {
        assert_eq!(signature(None), "Generated by perch");
        assert_eq!(signature(Some("abc")), "Generated by perch against abc");
    }
}
