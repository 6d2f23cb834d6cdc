// src/db/relation.rs
// DOCUMENTATION: Relation accessors built from (owner, target, foreign key)
// PURPOSE: One implementation of has-many and belongs-to shared by every
// relation pair, including self-relations

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use validator::Validate;

use crate::errors::ApiError;
use crate::models::{Entity, ForeignKey};

use super::crud::{to_document, CrudRepository};
use super::filter::{Filter, Where};

/// `S` has many `T`, linked by `key` on `T`
pub struct HasMany<S: Entity, T: Entity> {
    owner: CrudRepository<S>,
    target: CrudRepository<T>,
    key: ForeignKey<T>,
}

/// Has-many operations bound to one owner id
pub struct HasManyScope<'a, S: Entity, T: Entity> {
    relation: &'a HasMany<S, T>,
    owner_id: i64,
}

impl<S: Entity, T: Entity> HasMany<S, T> {
    pub fn new(owner: CrudRepository<S>, target: CrudRepository<T>, key: ForeignKey<T>) -> Self {
        Self { owner, target, key }
    }

    pub fn scope(&self, owner_id: i64) -> HasManyScope<'_, S, T> {
        HasManyScope {
            relation: self,
            owner_id,
        }
    }

    /// Inclusion resolver: one query for all owners, grouped by owner id
    pub async fn resolve(&self, owner_ids: &[i64]) -> Result<HashMap<i64, Vec<T>>, ApiError> {
        let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
        if owner_ids.is_empty() {
            return Ok(grouped);
        }

        let keys: BTreeSet<i64> = owner_ids.iter().copied().collect();
        let filter = Filter::with_where(Where::inq(
            self.key.field,
            keys.into_iter().map(Value::from).collect(),
        ));
        for related in self.target.find(&filter).await? {
            if let Some(owner_id) = (self.key.get)(&related) {
                grouped.entry(owner_id).or_default().push(related);
            }
        }
        Ok(grouped)
    }
}

impl<'a, S: Entity, T: Entity> HasManyScope<'a, S, T> {
    fn owner_clause(&self) -> Where {
        Where::eq(self.relation.key.field, self.owner_id)
    }

    async fn ensure_owner(&self) -> Result<(), ApiError> {
        if self.relation.owner.exists(self.owner_id).await? {
            Ok(())
        } else {
            log::warn!("{} not found: {}", S::NAME, self.owner_id);
            Err(ApiError::NotFound {
                entity: S::NAME,
                id: self.owner_id,
            })
        }
    }

    /// Related records of this owner; `include` is left to the caller
    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, ApiError> {
        self.ensure_owner().await?;
        let scoped = Filter {
            where_: Some(self.owner_clause().and_with(filter.where_.clone())),
            include: Vec::new(),
            ..filter.clone()
        };
        self.relation.target.find(&scoped).await
    }

    /// Create a related record; the owner key always comes from the scope
    pub async fn create<D: Serialize + Validate>(&self, data: &D) -> Result<T, ApiError> {
        data.validate()?;
        self.ensure_owner().await?;
        let mut doc = to_document(data)?;
        doc.insert(self.relation.key.field.to_string(), Value::from(self.owner_id));
        self.relation.target.create_document(doc).await
    }

    /// Patch matching related records in one data-source call
    pub async fn patch<D: Serialize + Validate>(
        &self,
        data: &D,
        where_: Option<Where>,
    ) -> Result<u64, ApiError> {
        data.validate()?;
        self.ensure_owner().await?;
        let mut doc = to_document(data)?;
        doc.remove(self.relation.key.field);
        self.relation.target.check_references(&doc).await?;

        let clause = self.owner_clause().and_with(where_);
        self.relation.target.update_all(Some(&clause), doc).await
    }

    /// Delete matching related records in one data-source call
    pub async fn delete(&self, where_: Option<Where>) -> Result<u64, ApiError> {
        self.ensure_owner().await?;
        let clause = self.owner_clause().and_with(where_);
        self.relation.target.delete_all(Some(&clause)).await
    }
}

/// `S` belongs to `T` through `key` on `S`
pub struct BelongsTo<S: Entity, T: Entity> {
    target: CrudRepository<T>,
    key: ForeignKey<S>,
}

impl<S: Entity, T: Entity> BelongsTo<S, T> {
    pub fn new(target: CrudRepository<T>, key: ForeignKey<S>) -> Self {
        Self { target, key }
    }

    /// The referenced record; `None` when the key is unset
    pub async fn get(&self, source: &S) -> Result<Option<T>, ApiError> {
        match (self.key.get)(source) {
            Some(id) => self.target.find_by_id(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Inclusion resolver: one query for the distinct keys of `sources`
    pub async fn resolve(&self, sources: &[S]) -> Result<HashMap<i64, T>, ApiError> {
        let keys: BTreeSet<i64> = sources.iter().filter_map(|s| (self.key.get)(s)).collect();
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = Filter::with_where(Where::inq("id", keys.into_iter().map(Value::from).collect()));
        Ok(self
            .target
            .find(&filter)
            .await?
            .into_iter()
            .map(|target| (target.id(), target))
            .collect())
    }
}
