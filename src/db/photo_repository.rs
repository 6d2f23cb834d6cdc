// src/db/photo_repository.rs
// DOCUMENTATION: Photo database operations
// PURPOSE: CRUD for photos plus the comments has-many relation

use std::sync::Arc;

use crate::errors::ApiError;
use crate::models::{Comment, Entity, NewPhoto, Photo, PhotoPatch};

use super::comment_repository::CommentRepository;
use super::crud::CrudRepository;
use super::datasource::DataSource;
use super::filter::{Condition, Filter, Where};
use super::relation::{HasMany, HasManyScope};

pub struct PhotoRepository {
    photos: CrudRepository<Photo>,
    comments: HasMany<Photo, Comment>,
    comment_records: CrudRepository<Comment>,
    comment_relations: CommentRepository,
}

impl PhotoRepository {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        let photos = CrudRepository::<Photo>::new(source.clone());
        let comment_records = CrudRepository::<Comment>::new(source.clone());
        Self {
            comments: HasMany::new(photos.clone(), comment_records.clone(), Comment::PHOTO_ID),
            photos,
            comment_records,
            comment_relations: CommentRepository::new(source),
        }
    }

    /// Create a new photo
    /// DOCUMENTATION: `link` must be non-empty; any `id` in the input is ignored
    pub async fn create(&self, data: &NewPhoto) -> Result<Photo, ApiError> {
        self.photos.create(data).await
    }

    /// Search photos
    /// DOCUMENTATION: `include: ["comments"]` costs one extra query for the whole page
    pub async fn find(&self, filter: &Filter) -> Result<Vec<Photo>, ApiError> {
        let mut photos = self.photos.find(filter).await?;
        self.include_relations(&mut photos, &filter.include).await?;
        Ok(photos)
    }

    pub async fn find_by_id(&self, id: i64, include: &[String]) -> Result<Photo, ApiError> {
        let mut photo = [self.photos.find_by_id(id).await?];
        self.include_relations(&mut photo, include).await?;
        let [photo] = photo;
        Ok(photo)
    }

    pub async fn count(&self, where_: Option<&Where>) -> Result<u64, ApiError> {
        self.photos.count(where_).await
    }

    pub async fn update_by_id(&self, id: i64, patch: &PhotoPatch) -> Result<(), ApiError> {
        self.photos.update_by_id(id, patch).await
    }

    pub async fn replace_by_id(&self, id: i64, data: &NewPhoto) -> Result<(), ApiError> {
        self.photos.replace_by_id(id, data).await
    }

    /// Delete a photo and its comments
    /// DOCUMENTATION: The photo goes first so a comment created concurrently
    /// fails its guarded insert instead of being left behind.
    pub async fn delete_by_id(&self, id: i64) -> Result<(), ApiError> {
        self.photos.delete_by_id(id).await?;
        let removed = self
            .comment_records
            .delete_all(Some(&Where::eq(Comment::PHOTO_ID.field, id)))
            .await?;
        log::info!("Cascaded delete of photo {} to {} comment(s)", id, removed);
        Ok(())
    }

    /// Delete every photo and every comment attached to a photo
    #[allow(dead_code)]
    pub async fn delete_all(&self) -> Result<u64, ApiError> {
        let count = self.photos.delete_all(None).await?;
        let attached = Where::Field {
            name: Comment::PHOTO_ID.field.to_string(),
            condition: Condition::Neq(serde_json::Value::Null),
        };
        self.comment_records.delete_all(Some(&attached)).await?;
        Ok(count)
    }

    /// Comments of one photo
    pub fn comments(&self, photo_id: i64) -> HasManyScope<'_, Photo, Comment> {
        self.comments.scope(photo_id)
    }

    /// Comments of one photo with the filter's comment inclusions resolved
    pub async fn find_comments(
        &self,
        photo_id: i64,
        filter: &Filter,
    ) -> Result<Vec<Comment>, ApiError> {
        let mut comments = self.comments(photo_id).find(filter).await?;
        self.comment_relations
            .include_relations(&mut comments, &filter.include)
            .await?;
        Ok(comments)
    }

    /// The photo's earliest comment
    pub async fn comment(&self, photo_id: i64) -> Result<Comment, ApiError> {
        let first = Filter {
            limit: Some(1),
            ..Default::default()
        };
        self.comments(photo_id)
            .find(&first)
            .await?
            .into_iter()
            .next()
            .ok_or(ApiError::RelationNotSet {
                entity: Photo::NAME,
                id: photo_id,
                relation: "comment",
            })
    }

    async fn include_relations(
        &self,
        photos: &mut [Photo],
        include: &[String],
    ) -> Result<(), ApiError> {
        for relation in include {
            match relation.as_str() {
                "comments" => {
                    let ids: Vec<i64> = photos.iter().map(|p| p.id).collect();
                    let mut grouped = self.comments.resolve(&ids).await?;
                    for photo in photos.iter_mut() {
                        photo.comments = Some(grouped.remove(&photo.id).unwrap_or_default());
                    }
                }
                other => {
                    return Err(ApiError::InvalidFilter(format!(
                        "{} has no relation `{}`",
                        Photo::NAME,
                        other
                    )))
                }
            }
        }
        Ok(())
    }
}
