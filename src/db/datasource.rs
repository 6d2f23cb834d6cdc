// src/db/datasource.rs
// DOCUMENTATION: Persistence contract consumed by every repository
// PURPOSE: Primitive per-table CRUD over JSON documents, injected at startup

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use super::filter::{Filter, Where};

/// One stored record as a JSON object
/// DOCUMENTATION: Documents handed to a data source never carry `id`;
/// documents returned by it always do.
pub type Document = Map<String, Value>;

/// Failures raised by a data source
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("malformed record in `{table}`: {message}")]
    Malformed { table: &'static str, message: String },
}

/// Parent row that must exist for a guarded insert to succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub table: &'static str,
    pub id: i64,
}

/// Injected persistence capability
/// DOCUMENTATION: Each call is atomic on its own; nothing here spans calls.
/// `table` is always an entity's static table name, never user input.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Connector name for logs
    fn name(&self) -> &'static str;

    /// Insert a record and return it with its assigned id
    async fn create(&self, table: &'static str, data: Document)
        -> Result<Document, DataSourceError>;

    /// Insert only if every referenced row exists, in one atomic step.
    /// Returns `None` when a reference is missing.
    async fn create_referencing(
        &self,
        table: &'static str,
        data: Document,
        references: &[Reference],
    ) -> Result<Option<Document>, DataSourceError>;

    async fn find(&self, table: &'static str, filter: &Filter)
        -> Result<Vec<Document>, DataSourceError>;

    async fn find_by_id(&self, table: &'static str, id: i64)
        -> Result<Option<Document>, DataSourceError>;

    async fn count(&self, table: &'static str, where_: Option<&Where>)
        -> Result<u64, DataSourceError>;

    /// Merge `patch` into the record; `false` when the id does not exist
    async fn update_by_id(
        &self,
        table: &'static str,
        id: i64,
        patch: Document,
    ) -> Result<bool, DataSourceError>;

    /// Replace all stored properties; `false` when the id does not exist
    async fn replace_by_id(
        &self,
        table: &'static str,
        id: i64,
        data: Document,
    ) -> Result<bool, DataSourceError>;

    async fn delete_by_id(&self, table: &'static str, id: i64) -> Result<bool, DataSourceError>;

    /// Merge `patch` into every matching record; returns rows affected
    async fn update_all(
        &self,
        table: &'static str,
        where_: Option<&Where>,
        patch: Document,
    ) -> Result<u64, DataSourceError>;

    /// Delete every matching record; returns rows affected
    async fn delete_all(&self, table: &'static str, where_: Option<&Where>)
        -> Result<u64, DataSourceError>;
}
