// src/db/comment_repository.rs
// DOCUMENTATION: Comment database operations
// PURPOSE: CRUD for comments plus the photo, parent and replies relations

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::ApiError;
use crate::models::{Comment, CommentUpdate, Entity, NewComment, Photo};

use super::crud::CrudRepository;
use super::datasource::DataSource;
use super::filter::{Filter, Where};
use super::relation::{BelongsTo, HasMany, HasManyScope};

pub struct CommentRepository {
    comments: CrudRepository<Comment>,
    photo: BelongsTo<Comment, Photo>,
    parent: BelongsTo<Comment, Comment>,
    replies: HasMany<Comment, Comment>,
    /// Serializes re-parenting so the ancestor walk and the write see the same tree
    reparent: Mutex<()>,
}

impl CommentRepository {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        let comments = CrudRepository::<Comment>::new(source.clone());
        Self {
            photo: BelongsTo::new(CrudRepository::new(source), Comment::PHOTO_ID),
            parent: BelongsTo::new(comments.clone(), Comment::COMMENT_ID),
            replies: HasMany::new(comments.clone(), comments.clone(), Comment::COMMENT_ID),
            comments,
            reparent: Mutex::new(()),
        }
    }

    /// Create a comment
    /// DOCUMENTATION: `photoId` and `commentId`, when set, must reference existing records
    pub async fn create(&self, data: &NewComment) -> Result<Comment, ApiError> {
        self.comments.create(data).await
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<Comment>, ApiError> {
        let mut comments = self.comments.find(filter).await?;
        self.include_relations(&mut comments, &filter.include).await?;
        Ok(comments)
    }

    pub async fn find_by_id(&self, id: i64, include: &[String]) -> Result<Comment, ApiError> {
        let mut comment = [self.comments.find_by_id(id).await?];
        self.include_relations(&mut comment, include).await?;
        let [comment] = comment;
        Ok(comment)
    }

    pub async fn count(&self, where_: Option<&Where>) -> Result<u64, ApiError> {
        self.comments.count(where_).await
    }

    /// Partial update; moving a comment under one of its own descendants is rejected
    pub async fn update_by_id(&self, id: i64, data: &CommentUpdate) -> Result<(), ApiError> {
        let Some(Some(parent_id)) = data.comment_id else {
            return self.comments.update_by_id(id, data).await;
        };

        let _guard = self.reparent.lock().await;
        self.comments.find_by_id(id).await?;
        self.ensure_acyclic(id, parent_id).await?;
        self.comments.update_by_id(id, data).await
    }

    /// Delete one comment
    /// DOCUMENTATION: Replies are kept; their `parent` lookup reports NotFound afterwards
    pub async fn delete_by_id(&self, id: i64) -> Result<(), ApiError> {
        self.comments.delete_by_id(id).await
    }

    #[allow(dead_code)]
    pub async fn delete_all(&self) -> Result<u64, ApiError> {
        self.comments.delete_all(None).await
    }

    /// The photo a comment belongs to
    pub async fn photo(&self, comment_id: i64) -> Result<Photo, ApiError> {
        let comment = self.comments.find_by_id(comment_id).await?;
        self.photo
            .get(&comment)
            .await?
            .ok_or(ApiError::RelationNotSet {
                entity: Comment::NAME,
                id: comment_id,
                relation: "photo",
            })
    }

    /// The comment this one replies to
    pub async fn parent(&self, comment_id: i64) -> Result<Comment, ApiError> {
        let comment = self.comments.find_by_id(comment_id).await?;
        self.parent
            .get(&comment)
            .await?
            .ok_or(ApiError::RelationNotSet {
                entity: Comment::NAME,
                id: comment_id,
                relation: "parent",
            })
    }

    /// Direct replies of one comment
    pub fn replies(&self, comment_id: i64) -> HasManyScope<'_, Comment, Comment> {
        self.replies.scope(comment_id)
    }

    /// Direct replies with the filter's inclusions resolved
    pub async fn find_replies(
        &self,
        comment_id: i64,
        filter: &Filter,
    ) -> Result<Vec<Comment>, ApiError> {
        let mut replies = self.replies(comment_id).find(filter).await?;
        self.include_relations(&mut replies, &filter.include).await?;
        Ok(replies)
    }

    /// Populate the requested inclusion slots, one level deep
    /// DOCUMENTATION: Included comments and photos never carry their own
    /// inclusions, so self-relations cannot recurse.
    pub async fn include_relations(
        &self,
        comments: &mut [Comment],
        include: &[String],
    ) -> Result<(), ApiError> {
        for relation in include {
            match relation.as_str() {
                "photo" => {
                    let photos = self.photo.resolve(comments).await?;
                    for comment in comments.iter_mut() {
                        comment.photo = comment
                            .photo_id
                            .and_then(|id| photos.get(&id).cloned())
                            .map(Box::new);
                    }
                }
                "parent" => {
                    let parents = self.parent.resolve(comments).await?;
                    for comment in comments.iter_mut() {
                        comment.parent = comment
                            .comment_id
                            .and_then(|id| parents.get(&id).cloned())
                            .map(Box::new);
                    }
                }
                "replies" => {
                    let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
                    let mut grouped = self.replies.resolve(&ids).await?;
                    for comment in comments.iter_mut() {
                        comment.replies = Some(grouped.remove(&comment.id).unwrap_or_default());
                    }
                }
                other => {
                    return Err(ApiError::InvalidFilter(format!(
                        "{} has no relation `{}`",
                        Comment::NAME,
                        other
                    )))
                }
            }
        }
        Ok(())
    }

    /// Walk up from the candidate parent; reaching `comment_id` means a cycle
    async fn ensure_acyclic(&self, comment_id: i64, parent_id: i64) -> Result<(), ApiError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(parent_id);
        while let Some(current) = cursor {
            if current == comment_id || !visited.insert(current) {
                log::warn!(
                    "Rejected moving comment {} under {}: cycle",
                    comment_id,
                    parent_id
                );
                return Err(ApiError::CycleDetected {
                    comment_id,
                    parent_id,
                });
            }
            cursor = self
                .comments
                .find_optional(current)
                .await?
                .and_then(|ancestor| ancestor.comment_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        given_comment, given_photo, given_repositories, given_sub_comment, repositories_over,
        CountingDataSource,
    };

    #[tokio::test]
    async fn test_replies_lists_exactly_the_children() {
        let (photos, comments) = given_repositories();
        let photo = photos.create(&given_photo()).await.unwrap();
        let a = comments.create(&given_comment(photo.id)).await.unwrap();
        let b = comments.create(&given_sub_comment(photo.id, a.id)).await.unwrap();
        comments.create(&given_comment(photo.id)).await.unwrap();

        let replies = comments.replies(a.id).find(&Filter::default()).await.unwrap();
        assert_eq!(replies, vec![b.clone()]);

        let none = comments.replies(b.id).find(&Filter::default()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_replies_of_missing_comment_is_not_found() {
        let (_, comments) = given_repositories();
        let err = comments.replies(5).find(&Filter::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { entity: "Comment", id: 5 }));
    }

    #[tokio::test]
    async fn test_reply_to_missing_parent_is_rejected() {
        let (photos, comments) = given_repositories();
        let photo = photos.create(&given_photo()).await.unwrap();
        let err = comments
            .create(&given_sub_comment(photo.id, 77))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ReferentialIntegrity(_)));
    }

    #[tokio::test]
    async fn test_photo_and_parent_accessors() {
        let (photos, comments) = given_repositories();
        let photo = photos.create(&given_photo()).await.unwrap();
        let a = comments.create(&given_comment(photo.id)).await.unwrap();
        let b = comments.create(&given_sub_comment(photo.id, a.id)).await.unwrap();

        assert_eq!(comments.photo(b.id).await.unwrap(), photo);
        assert_eq!(comments.parent(b.id).await.unwrap(), a);
        assert!(matches!(
            comments.parent(a.id).await,
            Err(ApiError::RelationNotSet { relation: "parent", .. })
        ));

        let orphan = comments
            .create(&NewComment {
                text: "standalone".into(),
                photo_id: None,
                comment_id: None,
            })
            .await
            .unwrap();
        assert!(matches!(
            comments.photo(orphan.id).await,
            Err(ApiError::RelationNotSet { relation: "photo", .. })
        ));
    }

    #[tokio::test]
    async fn test_cycles_are_rejected() {
        let (photos, comments) = given_repositories();
        let photo = photos.create(&given_photo()).await.unwrap();
        let a = comments.create(&given_comment(photo.id)).await.unwrap();
        let b = comments.create(&given_sub_comment(photo.id, a.id)).await.unwrap();
        let c = comments.create(&given_sub_comment(photo.id, b.id)).await.unwrap();

        let onto_self = CommentUpdate {
            text: None,
            comment_id: Some(Some(a.id)),
        };
        assert!(matches!(
            comments.update_by_id(a.id, &onto_self).await,
            Err(ApiError::CycleDetected { .. })
        ));

        let onto_grandchild = CommentUpdate {
            text: None,
            comment_id: Some(Some(c.id)),
        };
        assert!(matches!(
            comments.update_by_id(a.id, &onto_grandchild).await,
            Err(ApiError::CycleDetected { comment_id, parent_id }) if comment_id == a.id && parent_id == c.id
        ));

        let detach = CommentUpdate {
            text: None,
            comment_id: Some(None),
        };
        comments.update_by_id(c.id, &detach).await.unwrap();
        comments.update_by_id(a.id, &onto_grandchild).await.unwrap();
        assert_eq!(comments.parent(a.id).await.unwrap().id, c.id);
    }

    #[tokio::test]
    async fn test_concurrent_reparenting_cannot_form_a_cycle() {
        let source = Arc::new(CountingDataSource::with_update_gate(2));
        let (photos, comments) = repositories_over(source);
        let photo = photos.create(&given_photo()).await.unwrap();
        let a = comments.create(&given_comment(photo.id)).await.unwrap();
        let b = comments.create(&given_comment(photo.id)).await.unwrap();

        let a_under_b = CommentUpdate {
            text: None,
            comment_id: Some(Some(b.id)),
        };
        let b_under_a = CommentUpdate {
            text: None,
            comment_id: Some(Some(a.id)),
        };
        let (first, second) = tokio::join!(
            comments.update_by_id(a.id, &a_under_b),
            comments.update_by_id(b.id, &b_under_a)
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(ApiError::CycleDetected { .. })));
        assert_eq!(comments.parent(a.id).await.unwrap().id, b.id);
        assert!(matches!(
            comments.parent(b.id).await,
            Err(ApiError::RelationNotSet { relation: "parent", .. })
        ));
    }

    #[tokio::test]
    async fn test_deleting_a_parent_keeps_its_replies() {
        let (photos, comments) = given_repositories();
        let photo = photos.create(&given_photo()).await.unwrap();
        let a = comments.create(&given_comment(photo.id)).await.unwrap();
        let b = comments.create(&given_sub_comment(photo.id, a.id)).await.unwrap();

        comments.delete_by_id(a.id).await.unwrap();
        assert_eq!(comments.count(None).await.unwrap(), 1);
        assert!(matches!(
            comments.parent(b.id).await,
            Err(ApiError::NotFound { entity: "Comment", .. })
        ));

        assert_eq!(comments.delete_all().await.unwrap(), 1);
        assert!(comments.find(&Filter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inclusion_resolves_one_level_only() {
        let (photos, comments) = given_repositories();
        let photo = photos.create(&given_photo()).await.unwrap();
        let a = comments.create(&given_comment(photo.id)).await.unwrap();
        let b = comments.create(&given_sub_comment(photo.id, a.id)).await.unwrap();
        let c = comments.create(&given_sub_comment(photo.id, b.id)).await.unwrap();

        let include = vec!["parent".to_string(), "replies".to_string(), "photo".to_string()];
        let loaded = comments.find_by_id(c.id, &include).await.unwrap();

        let parent = loaded.parent.expect("parent included");
        assert_eq!(parent.id, b.id);
        assert!(parent.parent.is_none());
        assert!(parent.replies.is_none());
        assert_eq!(loaded.replies, Some(vec![]));
        assert_eq!(loaded.photo.map(|p| p.id), Some(photo.id));

        let top = comments.find_by_id(a.id, &["replies".to_string()]).await.unwrap();
        let replies = top.replies.unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].replies.is_none());
    }
}
