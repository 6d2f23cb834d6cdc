// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components and wire every route

pub mod comments;
pub mod health;
pub mod photos;

pub use comments::config as comments_config;
pub use health::config as health_config;
pub use photos::config as photos_config;

use crate::errors::ApiError;
use actix_web::web;

/// Route extractor failures through ApiError
/// DOCUMENTATION: Malformed bodies and query strings answer 422 with the
/// usual error body instead of actix's plain-text 400.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("Rejected request body: {}", err);
        ApiError::ValidationError(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::InvalidFilter(err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        ApiError::ValidationError(format!("invalid id in path: {}", err)).into()
    }));
}

/// Every route of the service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(extractor_config)
        .configure(health_config)
        .configure(photos_config)
        .configure(comments_config);
}
