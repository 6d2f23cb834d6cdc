// src/db/crud.rs
// DOCUMENTATION: Generic typed repository over a data source
// PURPOSE: Validation, (de)serialization, NotFound semantics and foreign-key
// checks shared by every entity

use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use validator::Validate;

use crate::errors::ApiError;
use crate::models::Entity;

use super::datasource::{DataSource, DataSourceError, Document, Reference};
use super::filter::{Filter, Where};

/// Typed CRUD access to the table of entity `E`
pub struct CrudRepository<E: Entity> {
    source: Arc<dyn DataSource>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for CrudRepository<E> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            _entity: PhantomData,
        }
    }
}

/// Serialize an input shape into a storable document without `id`
pub fn to_document<D: Serialize>(data: &D) -> Result<Document, ApiError> {
    match serde_json::to_value(data) {
        Ok(Value::Object(mut doc)) => {
            doc.remove("id");
            Ok(doc)
        }
        Ok(_) => Err(ApiError::ValidationError("body must be a JSON object".to_string())),
        Err(e) => Err(ApiError::ValidationError(e.to_string())),
    }
}

impl<E: Entity> CrudRepository<E> {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            _entity: PhantomData,
        }
    }

    fn decode(doc: Document) -> Result<E, ApiError> {
        serde_json::from_value(Value::Object(doc)).map_err(|e| {
            log::error!("Stored {} does not match its schema: {}", E::NAME, e);
            ApiError::from(DataSourceError::Malformed {
                table: E::TABLE,
                message: e.to_string(),
            })
        })
    }

    fn not_found(id: i64) -> ApiError {
        log::warn!("{} not found: {}", E::NAME, id);
        ApiError::NotFound { entity: E::NAME, id }
    }

    /// Validate and insert; foreign keys present in `data` must resolve
    pub async fn create<D: Serialize + Validate>(&self, data: &D) -> Result<E, ApiError> {
        data.validate()?;
        self.create_document(to_document(data)?).await
    }

    /// Insert an already validated document
    /// DOCUMENTATION: Every set foreign key is checked first for a precise
    /// error, then the insert itself is guarded so a parent deleted in
    /// between still rejects the write.
    pub async fn create_document(&self, doc: Document) -> Result<E, ApiError> {
        let references = self.check_references(&doc).await?;

        let created = if references.is_empty() {
            self.source.create(E::TABLE, doc).await?
        } else {
            self.source
                .create_referencing(E::TABLE, doc, &references)
                .await?
                .ok_or_else(|| {
                    log::warn!("Parent of new {} vanished before insert", E::NAME);
                    ApiError::ReferentialIntegrity(format!(
                        "a record referenced by the new {} was deleted concurrently",
                        E::NAME
                    ))
                })?
        };

        let entity = Self::decode(created)?;
        log::info!("Created {} {}", E::NAME, entity.id());
        Ok(entity)
    }

    /// Resolve every set foreign key in `doc` against its target table
    pub async fn check_references(&self, doc: &Document) -> Result<Vec<Reference>, ApiError> {
        let mut references = Vec::new();
        for key in E::FOREIGN_KEYS {
            let id = match doc.get(key.field) {
                None | Some(Value::Null) => continue,
                Some(value) => value.as_i64().ok_or_else(|| {
                    ApiError::ValidationError(format!("{} must be an integer id", key.field))
                })?,
            };
            if self.source.find_by_id(key.target_table, id).await?.is_none() {
                return Err(ApiError::ReferentialIntegrity(format!(
                    "{} {} referenced by {}.{} does not exist",
                    key.target,
                    id,
                    E::NAME,
                    key.field
                )));
            }
            references.push(Reference {
                table: key.target_table,
                id,
            });
        }
        Ok(references)
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<E>, ApiError> {
        log::debug!("Finding {} with {:?}", E::NAME, filter);
        self.source
            .find(E::TABLE, filter)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub async fn find_optional(&self, id: i64) -> Result<Option<E>, ApiError> {
        self.source
            .find_by_id(E::TABLE, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn find_by_id(&self, id: i64) -> Result<E, ApiError> {
        self.find_optional(id)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    pub async fn exists(&self, id: i64) -> Result<bool, ApiError> {
        Ok(self.source.find_by_id(E::TABLE, id).await?.is_some())
    }

    pub async fn count(&self, where_: Option<&Where>) -> Result<u64, ApiError> {
        Ok(self.source.count(E::TABLE, where_).await?)
    }

    /// Merge a validated partial update into one record
    pub async fn update_by_id<D: Serialize + Validate>(
        &self,
        id: i64,
        patch: &D,
    ) -> Result<(), ApiError> {
        patch.validate()?;
        let doc = to_document(patch)?;
        self.check_references(&doc).await?;

        if !self.source.update_by_id(E::TABLE, id, doc).await? {
            return Err(Self::not_found(id));
        }
        log::info!("Updated {} {}", E::NAME, id);
        Ok(())
    }

    /// Replace every stored property of one record
    pub async fn replace_by_id<D: Serialize + Validate>(
        &self,
        id: i64,
        data: &D,
    ) -> Result<(), ApiError> {
        data.validate()?;
        let doc = to_document(data)?;
        self.check_references(&doc).await?;

        if !self.source.replace_by_id(E::TABLE, id, doc).await? {
            return Err(Self::not_found(id));
        }
        log::info!("Replaced {} {}", E::NAME, id);
        Ok(())
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<(), ApiError> {
        if !self.source.delete_by_id(E::TABLE, id).await? {
            return Err(Self::not_found(id));
        }
        log::info!("Deleted {} {}", E::NAME, id);
        Ok(())
    }

    /// Single filtered update; the count is the data source's own report
    pub async fn update_all(&self, where_: Option<&Where>, patch: Document) -> Result<u64, ApiError> {
        let count = self.source.update_all(E::TABLE, where_, patch).await?;
        log::info!("Updated {} {} record(s)", count, E::NAME);
        Ok(count)
    }

    /// Single filtered delete; the count is the data source's own report
    pub async fn delete_all(&self, where_: Option<&Where>) -> Result<u64, ApiError> {
        let count = self.source.delete_all(E::TABLE, where_).await?;
        log::info!("Deleted {} {} record(s)", count, E::NAME);
        Ok(count)
    }
}
