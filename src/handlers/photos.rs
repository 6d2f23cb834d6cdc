// src/handlers/photos.rs
// DOCUMENTATION: HTTP handlers for photo operations
// PURPOSE: Parse requests, call the photo repository, return responses

use crate::db::PhotoRepository;
use crate::errors::ApiError;
use crate::models::{
    Comment, CommentPatch, Count, FilterParams, NewComment, NewPhoto, Photo, PhotoPatch,
    WhereParams,
};
use actix_web::{web, HttpResponse, Responder};

/// POST /photos
pub async fn create_photo(
    photos: web::Data<PhotoRepository>,
    req: web::Json<NewPhoto>,
) -> Result<impl Responder, ApiError> {
    let photo = photos.create(&req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(photo))
}

/// GET /photos?filter=
pub async fn list_photos(
    photos: web::Data<PhotoRepository>,
    query: web::Query<FilterParams>,
) -> Result<impl Responder, ApiError> {
    let filter = query.parse::<Photo>()?;
    let result = photos.find(&filter).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /photos/count?where=
pub async fn count_photos(
    photos: web::Data<PhotoRepository>,
    query: web::Query<WhereParams>,
) -> Result<impl Responder, ApiError> {
    let where_ = query.parse::<Photo>()?;
    let count = photos.count(where_.as_ref()).await?;
    Ok(HttpResponse::Ok().json(Count { count }))
}

/// GET /photos/{id}?filter=
/// Only the filter's `include` applies to a single record
pub async fn get_photo(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
    query: web::Query<FilterParams>,
) -> Result<impl Responder, ApiError> {
    let filter = query.parse::<Photo>()?;
    let photo = photos.find_by_id(path.into_inner(), &filter.include).await?;
    Ok(HttpResponse::Ok().json(photo))
}

/// PUT /photos/{id}
pub async fn replace_photo(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
    req: web::Json<NewPhoto>,
) -> Result<impl Responder, ApiError> {
    photos.replace_by_id(path.into_inner(), &req.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// PATCH /photos/{id}
pub async fn update_photo(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
    req: web::Json<PhotoPatch>,
) -> Result<impl Responder, ApiError> {
    photos.update_by_id(path.into_inner(), &req.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /photos/{id}
/// Removes the photo's comments as well
pub async fn delete_photo(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    photos.delete_by_id(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /photos/{id}/comment
pub async fn get_photo_comment(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    let comment = photos.comment(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// GET /photos/{id}/comments?filter=
pub async fn list_photo_comments(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
    query: web::Query<FilterParams>,
) -> Result<impl Responder, ApiError> {
    let filter = query.parse::<Comment>()?;
    let comments = photos.find_comments(path.into_inner(), &filter).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// POST /photos/{id}/comments
/// The path id wins over any `photoId` in the body
pub async fn create_photo_comment(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
    req: web::Json<NewComment>,
) -> Result<impl Responder, ApiError> {
    let comment = photos
        .comments(path.into_inner())
        .create(&req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// PATCH /photos/{id}/comments?where=
pub async fn patch_photo_comments(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
    query: web::Query<WhereParams>,
    req: web::Json<CommentPatch>,
) -> Result<impl Responder, ApiError> {
    let where_ = query.parse::<Comment>()?;
    let count = photos
        .comments(path.into_inner())
        .patch(&req.into_inner(), where_)
        .await?;
    Ok(HttpResponse::Ok().json(Count { count }))
}

/// DELETE /photos/{id}/comments?where=
pub async fn delete_photo_comments(
    photos: web::Data<PhotoRepository>,
    path: web::Path<i64>,
    query: web::Query<WhereParams>,
) -> Result<impl Responder, ApiError> {
    let where_ = query.parse::<Comment>()?;
    let count = photos.comments(path.into_inner()).delete(where_).await?;
    Ok(HttpResponse::Ok().json(Count { count }))
}

/// Configuration for photo routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/photos")
            .route("", web::post().to(create_photo))
            .route("", web::get().to(list_photos))
            .route("/count", web::get().to(count_photos))
            .route("/{id}", web::get().to(get_photo))
            .route("/{id}", web::put().to(replace_photo))
            .route("/{id}", web::patch().to(update_photo))
            .route("/{id}", web::delete().to(delete_photo))
            .route("/{id}/comment", web::get().to(get_photo_comment))
            .route("/{id}/comments", web::get().to(list_photo_comments))
            .route("/{id}/comments", web::post().to(create_photo_comment))
            .route("/{id}/comments", web::patch().to(patch_photo_comments))
            .route("/{id}/comments", web::delete().to(delete_photo_comments)),
    );
}
