// src/models/photo.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Comment, Entity, ForeignKey};

/// Photo record
/// DOCUMENTATION: `comments` is only populated when the caller asks for
/// `include: ["comments"]`; it is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: i64,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

impl Entity for Photo {
    const NAME: &'static str = "Photo";
    const TABLE: &'static str = "photos";
    const PROPERTIES: &'static [&'static str] = &["id", "link", "title"];
    const RELATIONS: &'static [&'static str] = &["comments"];
    const FOREIGN_KEYS: &'static [ForeignKey<Self>] = &[];

    fn id(&self) -> i64 {
        self.id
    }
}

/// Request body for POST /photos and PUT /photos/{id}
/// DOCUMENTATION: Any `id` in the body is ignored; ids are assigned by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    #[validate(length(min = 1, message = "link must not be empty"))]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Request body for PATCH /photos/{id}
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PhotoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "link must not be empty"))]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_optionals_are_omitted() {
        let photo = Photo {
            id: 3,
            link: "link".into(),
            title: None,
            comments: None,
        };
        assert_eq!(serde_json::to_value(&photo).unwrap(), json!({"id": 3, "link": "link"}));
    }

    #[test]
    fn test_new_photo_requires_link() {
        let missing = serde_json::from_value::<NewPhoto>(json!({"title": "Wedding dance"}));
        assert!(missing.is_err());

        let empty = NewPhoto {
            link: String::new(),
            title: None,
        };
        assert!(empty.validate().is_err());
    }
}
