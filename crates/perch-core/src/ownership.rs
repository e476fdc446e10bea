//! Recognizing the comments Perch wrote.
//!
//! A comment is owned by a marker id when its body contains the id's tag
//! and it was written by the account Perch runs as. Without a known
//! account UUID nothing is owned, so Perch never edits other people's
//! comments.

use perch_bitbucket::{BitbucketClient, Comment};

use crate::error::Result;
use crate::marker::{self, Location, MarkerId};

/// An inline comment as seen by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComment {
    /// Comment id.
    pub id: u64,
    /// Raw body.
    pub body: String,
    /// Whether Perch wrote it under the current marker id.
    pub owned: bool,
    /// Where it is anchored.
    pub location: Option<Location>,
}

/// Whether `comment` was written by `account_uuid` under `id`.
#[must_use]
pub fn is_owned(comment: &Comment, id: &MarkerId, account_uuid: Option<&str>) -> bool {
    let Some(uuid) = account_uuid else {
        return false;
    };

    comment.user.uuid.as_deref() == Some(uuid) && comment.body().contains(&id.tag())
}

/// Owned comments that are not attached to a file line.
#[must_use]
pub fn main_comments(
    comments: Vec<Comment>,
    id: &MarkerId,
    account_uuid: Option<&str>,
) -> Vec<Comment> {
    comments
        .into_iter()
        .filter(|c| !c.is_inline())
        .filter(|c| is_owned(c, id, account_uuid))
        .collect()
}

/// Every inline comment, flagged with ownership.
///
/// The location comes from the API's inline anchor and falls back to the
/// one recorded in the marker.
#[must_use]
pub fn inline_comments(
    comments: &[Comment],
    id: &MarkerId,
    account_uuid: Option<&str>,
) -> Vec<InlineComment> {
    comments
        .iter()
        .filter_map(|comment| {
            let anchor = comment.inline.as_ref()?;
            let location = anchor
                .line()
                .map(|line| Location {
                    path: anchor.path.clone(),
                    line,
                })
                .or_else(|| marker::parse(comment.body()).and_then(|m| m.location));

            Some(InlineComment {
                id: comment.id,
                body: comment.body().to_string(),
                owned: is_owned(comment, id, account_uuid),
                location,
            })
        })
        .collect()
}

/// Fetch the owned main comments on the client's pull request.
///
/// # Errors
/// Returns error if the comments cannot be listed.
pub async fn fetch_main_comments(
    client: &BitbucketClient,
    id: &MarkerId,
) -> Result<Vec<Comment>> {
    let comments = client.comments().await?;
    let uuid = client.account_uuid().await;
    Ok(main_comments(comments, id, uuid))
}

/// Fetch every inline comment on the client's pull request.
///
/// # Errors
/// Returns error if the comments cannot be listed.
pub async fn fetch_inline_comments(
    client: &BitbucketClient,
    id: &MarkerId,
) -> Result<Vec<InlineComment>> {
    let comments = client.comments().await?;
    let uuid = client.account_uuid().await;
    Ok(inline_comments(&comments, id, uuid))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const BOT: &str = "{1234-1234-1234-1234}";

    fn comment(value: serde_json::Value) -> Comment {
        serde_json::from_value(value).unwrap()
    }

    fn id() -> MarkerId {
        MarkerId::new("1").unwrap()
    }

    fn sample() -> Vec<Comment> {
        vec![
            comment(json!({
                "id": 1,
                "content": { "raw": "FAIL! perch-id-1; \nGenerated by perch against e70f3d6\n" },
                "user": { "uuid": BOT, "display_name": "name" }
            })),
            comment(json!({
                "id": 2,
                "content": { "raw": "not a perch comment" },
                "user": { "uuid": "{1234-1234-1234-1235}", "display_name": "someone" }
            })),
            comment(json!({
                "id": 3,
                "content": { "raw": "perch-id-1; copied by a human" },
                "user": { "uuid": "{1234-1234-1234-1235}", "display_name": "someone" }
            })),
            comment(json!({
                "id": 1234,
                "content": {
                    "raw": "\n[//]: # (perch-id-1;)\n[//]: # (  File: dangerfile.ts;\n  Line: 5;)\n\n- :warning: Hello updates\n\n\n  "
                },
                "inline": { "from": 5, "path": "dangerfile.ts" },
                "user": { "uuid": BOT, "display_name": "name" }
            })),
        ]
    }

    #[test]
    fn test_main_comments_need_tag_and_author() {
        let owned = main_comments(sample(), &id(), Some(BOT));
        let ids: Vec<u64> = owned.iter().map(|c| c.id).collect();
        assert_eq!(ids, [1]);
    }

    #[test]
    fn test_other_marker_ids_are_not_owned() {
        let other = MarkerId::new("2").unwrap();
        assert!(main_comments(sample(), &other, Some(BOT)).is_empty());
    }

    #[test]
    fn test_unknown_account_owns_nothing() {
        assert!(main_comments(sample(), &id(), None).is_empty());
        assert!(
            inline_comments(&sample(), &id(), None)
                .iter()
                .all(|c| !c.owned)
        );
    }

    #[test]
    fn test_inline_comments() {
        let inline = inline_comments(&sample(), &id(), Some(BOT));
        assert_eq!(inline.len(), 1);

        let first = &inline[0];
        assert_eq!(first.id, 1234);
        assert!(first.owned);
        assert_eq!(
            first.location,
            Some(Location {
                path: "dangerfile.ts".into(),
                line: 5
            })
        );
    }

    #[test]
    fn test_inline_location_falls_back_to_marker() {
        let comments = vec![comment(json!({
            "id": 8,
            "content": { "raw": "[//]: # (perch-id-1;)\n[//]: # (  File: b.rs;\n  Line: 9;)\n\nx" },
            "inline": { "path": "b.rs" },
            "user": { "uuid": BOT, "display_name": "name" }
        }))];

        let inline = inline_comments(&comments, &id(), Some(BOT));
        assert_eq!(inline[0].location.as_ref().map(|l| l.line), Some(9));
    }
}
