// src/db/memory.rs
// DOCUMENTATION: In-memory data source
// PURPOSE: Default connector for development and the backing store for tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::datasource::{DataSource, DataSourceError, Document, Reference};
use super::filter::{Filter, Where};

/// Rows of one table keyed by id
#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Document>,
}

impl Table {
    fn materialize(id: i64, row: &Document) -> Document {
        let mut doc = row.clone();
        doc.insert("id".to_string(), Value::from(id));
        doc
    }

    fn matching(&self, where_: Option<&Where>) -> Vec<i64> {
        self.rows
            .iter()
            .filter(|(id, row)| match where_ {
                Some(clause) => clause.matches(&Self::materialize(**id, row)),
                None => true,
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn insert(&mut self, mut data: Document) -> Document {
        data.remove("id");
        self.last_id += 1;
        let id = self.last_id;
        let doc = Self::materialize(id, &data);
        self.rows.insert(id, data);
        doc
    }
}

/// Thread-safe in-memory store
/// DOCUMENTATION: One write lock per mutating call makes every primitive
/// atomic. Ids are never reused within a table. Callers always receive
/// copies of stored rows.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn merge(row: &mut Document, patch: Document) {
    for (key, value) in patch {
        if key != "id" {
            row.insert(key, value);
        }
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        table: &'static str,
        data: Document,
    ) -> Result<Document, DataSourceError> {
        let mut tables = self.tables.write().await;
        Ok(tables.entry(table).or_default().insert(data))
    }

    async fn create_referencing(
        &self,
        table: &'static str,
        data: Document,
        references: &[Reference],
    ) -> Result<Option<Document>, DataSourceError> {
        let mut tables = self.tables.write().await;
        let all_present = references.iter().all(|reference| {
            tables
                .get(reference.table)
                .map_or(false, |t| t.rows.contains_key(&reference.id))
        });
        if !all_present {
            return Ok(None);
        }
        Ok(Some(tables.entry(table).or_default().insert(data)))
    }

    async fn find(
        &self,
        table: &'static str,
        filter: &Filter,
    ) -> Result<Vec<Document>, DataSourceError> {
        let tables = self.tables.read().await;
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let matched = t
            .matching(filter.where_.as_ref())
            .into_iter()
            .filter_map(|id| t.rows.get(&id).map(|row| Table::materialize(id, row)))
            .collect();
        Ok(filter.arrange(matched))
    }

    async fn find_by_id(
        &self,
        table: &'static str,
        id: i64,
    ) -> Result<Option<Document>, DataSourceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|t| t.rows.get(&id))
            .map(|row| Table::materialize(id, row)))
    }

    async fn count(
        &self,
        table: &'static str,
        where_: Option<&Where>,
    ) -> Result<u64, DataSourceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map_or(0, |t| t.matching(where_).len() as u64))
    }

    async fn update_by_id(
        &self,
        table: &'static str,
        id: i64,
        patch: Document,
    ) -> Result<bool, DataSourceError> {
        let mut tables = self.tables.write().await;
        match tables.get_mut(table).and_then(|t| t.rows.get_mut(&id)) {
            Some(row) => {
                merge(row, patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_by_id(
        &self,
        table: &'static str,
        id: i64,
        mut data: Document,
    ) -> Result<bool, DataSourceError> {
        let mut tables = self.tables.write().await;
        match tables.get_mut(table).and_then(|t| t.rows.get_mut(&id)) {
            Some(row) => {
                data.remove("id");
                *row = data;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, table: &'static str, id: i64) -> Result<bool, DataSourceError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(table)
            .map_or(false, |t| t.rows.remove(&id).is_some()))
    }

    async fn update_all(
        &self,
        table: &'static str,
        where_: Option<&Where>,
        patch: Document,
    ) -> Result<u64, DataSourceError> {
        let mut tables = self.tables.write().await;
        let Some(t) = tables.get_mut(table) else {
            return Ok(0);
        };
        let ids = t.matching(where_);
        for id in &ids {
            if let Some(row) = t.rows.get_mut(id) {
                merge(row, patch.clone());
            }
        }
        Ok(ids.len() as u64)
    }

    async fn delete_all(
        &self,
        table: &'static str,
        where_: Option<&Where>,
    ) -> Result<u64, DataSourceError> {
        let mut tables = self.tables.write().await;
        let Some(t) = tables.get_mut(table) else {
            return Ok(0);
        };
        let ids = t.matching(where_);
        for id in &ids {
            t.rows.remove(id);
        }
        Ok(ids.len() as u64)
    }
}
