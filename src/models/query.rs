// src/models/query.rs
// DOCUMENTATION: Query-string and response shapes shared by handlers

use serde::{Deserialize, Serialize};

use super::Entity;
use crate::db::{Filter, Where};
use crate::errors::ApiError;

/// `?filter=<json>` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub filter: Option<String>,
}

impl FilterParams {
    /// Parsed filter for entity `E`; absent means "match everything"
    pub fn parse<E: Entity>(&self) -> Result<Filter, ApiError> {
        match self.filter.as_deref() {
            Some(raw) => Filter::parse_str::<E>(raw),
            None => Ok(Filter::default()),
        }
    }
}

/// `?where=<json>` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct WhereParams {
    #[serde(rename = "where")]
    pub where_: Option<String>,
}

impl WhereParams {
    pub fn parse<E: Entity>(&self) -> Result<Option<Where>, ApiError> {
        self.where_
            .as_deref()
            .map(Where::parse_str::<E>)
            .transpose()
    }
}

/// Body of bulk operation responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub count: u64,
}
