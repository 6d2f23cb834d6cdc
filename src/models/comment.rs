// src/models/comment.rs

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::{Entity, ForeignKey, Photo};

/// Comment record
/// DOCUMENTATION: Standalone entity with two optional foreign keys:
/// `photoId` (the photo it belongs to) and `commentId` (its parent comment).
/// `photo`, `parent` and `replies` are inclusion slots and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Box<Photo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Comment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Comment>>,
}

impl Comment {
    pub const PHOTO_ID: ForeignKey<Comment> = ForeignKey {
        field: "photoId",
        target: Photo::NAME,
        target_table: Photo::TABLE,
        get: photo_id_of,
    };

    pub const COMMENT_ID: ForeignKey<Comment> = ForeignKey {
        field: "commentId",
        target: <Comment as Entity>::NAME,
        target_table: <Comment as Entity>::TABLE,
        get: parent_id_of,
    };
}

fn photo_id_of(comment: &Comment) -> Option<i64> {
    comment.photo_id
}

fn parent_id_of(comment: &Comment) -> Option<i64> {
    comment.comment_id
}

impl Entity for Comment {
    const NAME: &'static str = "Comment";
    const TABLE: &'static str = "comments";
    const PROPERTIES: &'static [&'static str] = &["id", "text", "photoId", "commentId"];
    const RELATIONS: &'static [&'static str] = &["photo", "parent", "replies"];
    const FOREIGN_KEYS: &'static [ForeignKey<Self>] = &[Self::PHOTO_ID, Self::COMMENT_ID];

    fn id(&self) -> i64 {
        self.id
    }
}

/// Request body for creating a comment
/// DOCUMENTATION: Under POST /photos/{id}/comments the path id replaces `photoId`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<i64>,
}

/// Request body for PATCH /photos/{id}/comments
/// DOCUMENTATION: Bulk patches only touch `text`; foreign keys are not bulk-editable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CommentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: Option<String>,
}

/// Request body for PATCH /comments/{id}
/// DOCUMENTATION: `commentId: null` detaches the comment from its parent,
/// an absent `commentId` leaves it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CommentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub comment_id: Option<Option<i64>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comment_update_distinguishes_null_from_absent() {
        let absent: CommentUpdate = serde_json::from_value(json!({"text": "x"})).unwrap();
        assert_eq!(absent.comment_id, None);
        assert_eq!(serde_json::to_value(&absent).unwrap(), json!({"text": "x"}));

        let detach: CommentUpdate = serde_json::from_value(json!({"commentId": null})).unwrap();
        assert_eq!(detach.comment_id, Some(None));
        assert_eq!(serde_json::to_value(&detach).unwrap(), json!({"commentId": null}));

        let moved: CommentUpdate = serde_json::from_value(json!({"commentId": 4})).unwrap();
        assert_eq!(moved.comment_id, Some(Some(4)));
    }

    #[test]
    fn test_comment_has_no_photo_fields() {
        let comment: Comment =
            serde_json::from_value(json!({"id": 1, "text": "hi", "photoId": 2})).unwrap();
        let value = serde_json::to_value(&comment).unwrap();
        assert!(value.get("link").is_none());
        assert!(value.get("title").is_none());
        assert_eq!(value, json!({"id": 1, "text": "hi", "photoId": 2}));
    }

    #[test]
    fn test_foreign_keys_point_at_entity_tables() {
        assert_eq!(Comment::PHOTO_ID.target_table, Photo::TABLE);
        assert_eq!(Comment::COMMENT_ID.target, Comment::NAME);
        assert_eq!(Comment::COMMENT_ID.target_table, Comment::TABLE);
    }
}
