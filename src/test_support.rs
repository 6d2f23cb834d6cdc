// src/test_support.rs
// DOCUMENTATION: Fixtures shared by unit tests
// PURPOSE: Fresh in-memory store per test, input builders, call counting

use actix_web::web;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

use crate::db::{
    CommentRepository, DataSource, DataSourceError, Document, Filter, MemoryDataSource,
    PhotoRepository, Reference, Where,
};
use crate::models::{NewComment, NewPhoto};

pub fn given_photo() -> NewPhoto {
    NewPhoto {
        link: "link".to_string(),
        title: Some("Wedding dance".to_string()),
    }
}

pub fn given_comment(photo_id: i64) -> NewComment {
    NewComment {
        text: "Wedding comment".to_string(),
        photo_id: Some(photo_id),
        comment_id: None,
    }
}

pub fn given_sub_comment(photo_id: i64, comment_id: i64) -> NewComment {
    NewComment {
        text: "Wedding sub comment".to_string(),
        photo_id: Some(photo_id),
        comment_id: Some(comment_id),
    }
}

/// Repositories over a brand new in-memory store
pub fn given_repositories() -> (PhotoRepository, CommentRepository) {
    repositories_over(Arc::new(MemoryDataSource::new()))
}

pub fn repositories_over(source: Arc<dyn DataSource>) -> (PhotoRepository, CommentRepository) {
    (
        PhotoRepository::new(source.clone()),
        CommentRepository::new(source),
    )
}

/// Repository app data for handler tests
pub fn given_app_data() -> (web::Data<PhotoRepository>, web::Data<CommentRepository>) {
    let (photos, comments) = given_repositories();
    (web::Data::new(photos), web::Data::new(comments))
}

/// Memory store that records how many `find` calls hit each table
/// DOCUMENTATION: With an update gate, `update_by_id` waits until `parties`
/// writers arrive (or a short timeout passes), which lines up racing writers.
#[derive(Default)]
pub struct CountingDataSource {
    inner: MemoryDataSource,
    finds: Mutex<HashMap<&'static str, usize>>,
    update_gate: Option<Barrier>,
}

impl CountingDataSource {
    pub fn with_update_gate(parties: usize) -> Self {
        Self {
            update_gate: Some(Barrier::new(parties)),
            ..Self::default()
        }
    }

    pub fn finds_on(&self, table: &str) -> usize {
        self.finds
            .lock()
            .unwrap()
            .get(table)
            .copied()
            .unwrap_or(0)
    }

    pub fn reset(&self) {
        self.finds.lock().unwrap().clear();
    }
}

#[async_trait]
impl DataSource for CountingDataSource {
    fn name(&self) -> &'static str {
        "counting-memory"
    }

    async fn create(
        &self,
        table: &'static str,
        data: Document,
    ) -> Result<Document, DataSourceError> {
        self.inner.create(table, data).await
    }

    async fn create_referencing(
        &self,
        table: &'static str,
        data: Document,
        references: &[Reference],
    ) -> Result<Option<Document>, DataSourceError> {
        self.inner.create_referencing(table, data, references).await
    }

    async fn find(
        &self,
        table: &'static str,
        filter: &Filter,
    ) -> Result<Vec<Document>, DataSourceError> {
        *self.finds.lock().unwrap().entry(table).or_default() += 1;
        self.inner.find(table, filter).await
    }

    async fn find_by_id(
        &self,
        table: &'static str,
        id: i64,
    ) -> Result<Option<Document>, DataSourceError> {
        self.inner.find_by_id(table, id).await
    }

    async fn count(
        &self,
        table: &'static str,
        where_: Option<&Where>,
    ) -> Result<u64, DataSourceError> {
        self.inner.count(table, where_).await
    }

    async fn update_by_id(
        &self,
        table: &'static str,
        id: i64,
        patch: Document,
    ) -> Result<bool, DataSourceError> {
        if let Some(gate) = &self.update_gate {
            // Serialized callers never meet; the timeout lets them through one by one
            let _ = tokio::time::timeout(Duration::from_millis(200), gate.wait()).await;
        }
        self.inner.update_by_id(table, id, patch).await
    }

    async fn replace_by_id(
        &self,
        table: &'static str,
        id: i64,
        data: Document,
    ) -> Result<bool, DataSourceError> {
        self.inner.replace_by_id(table, id, data).await
    }

    async fn delete_by_id(&self, table: &'static str, id: i64) -> Result<bool, DataSourceError> {
        self.inner.delete_by_id(table, id).await
    }

    async fn update_all(
        &self,
        table: &'static str,
        where_: Option<&Where>,
        patch: Document,
    ) -> Result<u64, DataSourceError> {
        self.inner.update_all(table, where_, patch).await
    }

    async fn delete_all(
        &self,
        table: &'static str,
        where_: Option<&Where>,
    ) -> Result<u64, DataSourceError> {
        self.inner.delete_all(table, where_).await
    }
}
