// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

use crate::db::DataSourceError;

/// Application-specific error types
/// DOCUMENTATION: Every repository and handler operation fails with one of these.
/// Each variant maps to an HTTP status code and a JSON error body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} {id} has no {relation}")]
    RelationNotSet {
        entity: &'static str,
        id: i64,
        relation: &'static str,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    #[error("Comment {comment_id} cannot be moved under {parent_id}: it would become its own ancestor")]
    CycleDetected { comment_id: i64, parent_id: i64 },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } | ApiError::RelationNotSet { .. } => "NOT_FOUND",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidFilter(_) => "INVALID_FILTER",
            ApiError::ReferentialIntegrity(_) => "REFERENTIAL_INTEGRITY",
            ApiError::CycleDetected { .. } => "CYCLE_DETECTED",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }
}

impl From<DataSourceError> for ApiError {
    fn from(err: DataSourceError) -> Self {
        ApiError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Convert ApiError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } | ApiError::RelationNotSet { .. } => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_)
            | ApiError::InvalidFilter(_)
            | ApiError::ReferentialIntegrity(_)
            | ApiError::CycleDetected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        let not_found = ApiError::NotFound { entity: "Photo", id: 7 };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "Photo not found with id: 7");

        assert_eq!(
            ApiError::ValidationError("link".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::CycleDetected { comment_id: 1, parent_id: 2 }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::DatabaseError("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_rt::test]
    async fn test_error_body_shape() {
        let response = ApiError::InvalidFilter("unknown field `foo`".into()).error_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "INVALID_FILTER");
        assert_eq!(body["error"]["message"], "Invalid filter: unknown field `foo`");
        assert!(body["error"]["timestamp"].is_string());
    }
}
