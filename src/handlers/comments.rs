// src/handlers/comments.rs
// DOCUMENTATION: HTTP handlers for comment operations
// PURPOSE: Parse requests, call the comment repository, return responses

use crate::db::CommentRepository;
use crate::errors::ApiError;
use crate::models::{Comment, CommentUpdate, Count, FilterParams, NewComment, WhereParams};
use actix_web::{web, HttpResponse, Responder};

/// POST /comments
/// `photoId` and `commentId` are optional but must exist when set
pub async fn create_comment(
    comments: web::Data<CommentRepository>,
    req: web::Json<NewComment>,
) -> Result<impl Responder, ApiError> {
    let comment = comments.create(&req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// GET /comments/count?where=
pub async fn count_comments(
    comments: web::Data<CommentRepository>,
    query: web::Query<WhereParams>,
) -> Result<impl Responder, ApiError> {
    let where_ = query.parse::<Comment>()?;
    let count = comments.count(where_.as_ref()).await?;
    Ok(HttpResponse::Ok().json(Count { count }))
}

/// GET /comments?filter=
pub async fn list_comments(
    comments: web::Data<CommentRepository>,
    query: web::Query<FilterParams>,
) -> Result<impl Responder, ApiError> {
    let filter = query.parse::<Comment>()?;
    let result = comments.find(&filter).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /comments/{id}?filter=
pub async fn get_comment(
    comments: web::Data<CommentRepository>,
    path: web::Path<i64>,
    query: web::Query<FilterParams>,
) -> Result<impl Responder, ApiError> {
    let filter = query.parse::<Comment>()?;
    let comment = comments
        .find_by_id(path.into_inner(), &filter.include)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// PATCH /comments/{id}
/// `commentId` re-parents the comment; `null` detaches it
pub async fn update_comment(
    comments: web::Data<CommentRepository>,
    path: web::Path<i64>,
    req: web::Json<CommentUpdate>,
) -> Result<impl Responder, ApiError> {
    comments
        .update_by_id(path.into_inner(), &req.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /comments/{id}
pub async fn delete_comment(
    comments: web::Data<CommentRepository>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    comments.delete_by_id(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /comments/{id}/photo
pub async fn get_comment_photo(
    comments: web::Data<CommentRepository>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    let photo = comments.photo(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(photo))
}

/// GET /comments/{id}/parent
pub async fn get_comment_parent(
    comments: web::Data<CommentRepository>,
    path: web::Path<i64>,
) -> Result<impl Responder, ApiError> {
    let parent = comments.parent(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(parent))
}

/// GET /comment/{id}/comments?filter=
/// Direct replies of one comment
pub async fn list_replies(
    comments: web::Data<CommentRepository>,
    path: web::Path<i64>,
    query: web::Query<FilterParams>,
) -> Result<impl Responder, ApiError> {
    let filter = query.parse::<Comment>()?;
    let replies = comments.find_replies(path.into_inner(), &filter).await?;
    Ok(HttpResponse::Ok().json(replies))
}

/// Configuration for comment routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/comments")
            .route("", web::post().to(create_comment))
            .route("", web::get().to(list_comments))
            .route("/count", web::get().to(count_comments))
            .route("/{id}", web::get().to(get_comment))
            .route("/{id}", web::patch().to(update_comment))
            .route("/{id}", web::delete().to(delete_comment))
            .route("/{id}/photo", web::get().to(get_comment_photo))
            .route("/{id}/parent", web::get().to(get_comment_parent)),
    )
    .service(web::scope("/comment").route("/{id}/comments", web::get().to(list_replies)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure;
    use crate::test_support::given_app_data;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn test_nested_replies_over_http() {
        let (photos, comments) = given_app_data();
        let app = test::init_service(
            App::new()
                .app_data(photos)
                .app_data(comments)
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/photos")
            .set_json(json!({"link": "link", "title": "Wedding dance"}))
            .to_request();
        let photo: Value = test::call_and_read_body_json(&app, req).await;
        let photo_id = photo["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/photos/{}/comments", photo_id))
            .set_json(json!({"text": "Wedding comment"}))
            .to_request();
        let a: Value = test::call_and_read_body_json(&app, req).await;
        let a_id = a["id"].as_i64().unwrap();
        assert!(a.get("link").is_none());

        let req = test::TestRequest::post()
            .uri(&format!("/photos/{}/comments", photo_id))
            .set_json(json!({"text": "Wedding sub comment", "commentId": a_id}))
            .to_request();
        let b: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get()
            .uri(&format!("/comment/{}/comments", a_id))
            .to_request();
        let replies: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(replies, json!([b.clone()]));

        let req = test::TestRequest::get()
            .uri(&format!("/comments/{}/parent", b["id"]))
            .to_request();
        let parent: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(parent, a);

        let req = test::TestRequest::get()
            .uri(&format!("/comments/{}/photo", a_id))
            .to_request();
        let owner: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(owner, photo);
    }

    #[actix_rt::test]
    async fn test_reparenting_into_a_cycle_is_unprocessable() {
        let (photos, comments) = given_app_data();
        let app = test::init_service(
            App::new()
                .app_data(photos)
                .app_data(comments)
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/photos")
            .set_json(json!({"link": "link"}))
            .to_request();
        let photo: Value = test::call_and_read_body_json(&app, req).await;
        let uri = format!("/photos/{}/comments", photo["id"]);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({"text": "top"}))
            .to_request();
        let top: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({"text": "reply", "commentId": top["id"]}))
            .to_request();
        let reply: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/comments/{}", top["id"]))
            .set_json(json!({"commentId": reply["id"]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "CYCLE_DETECTED");

        let req = test::TestRequest::patch()
            .uri(&format!("/comments/{}", reply["id"]))
            .set_json(json!({"commentId": null}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/comments/{}/parent", reply["id"]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_standalone_comments_and_count() {
        let (photos, comments) = given_app_data();
        let app = test::init_service(
            App::new()
                .app_data(photos)
                .app_data(comments)
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/comments")
            .set_json(json!({"text": "standalone"}))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created, json!({"id": created["id"], "text": "standalone"}));

        let req = test::TestRequest::post()
            .uri("/comments")
            .set_json(json!({"text": "dangling", "photoId": 404}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "REFERENTIAL_INTEGRITY");

        let req = test::TestRequest::get()
            .uri("/comments/count?where=%7B%22text%22%3A%22standalone%22%7D")
            .to_request();
        let count: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(count, json!({"count": 1}));
    }

    #[actix_rt::test]
    async fn test_missing_comment_is_not_found() {
        let (photos, comments) = given_app_data();
        let app = test::init_service(
            App::new()
                .app_data(photos)
                .app_data(comments)
                .configure(configure),
        )
        .await;

        for uri in ["/comments/5", "/comments/5/photo", "/comment/5/comments"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        }

        let req = test::TestRequest::delete().uri("/comments/5").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
