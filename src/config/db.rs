// src/config/db.rs
// DOCUMENTATION: Data source initialization
// PURPOSE: Setup the PostgreSQL connection pool or the in-memory store

use crate::config::{Config, DataSourceKind};
use crate::db::{DataSource, DataSourceError, MemoryDataSource, PgDataSource};
use crate::models::{Comment, Entity, Photo};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

/// Initialize PostgreSQL connection pool
/// DOCUMENTATION: Called once during startup when DATA_SOURCE=postgres
pub async fn init_db_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    log::info!("Initializing database pool");

    let pool = PgPoolOptions::new()
        // Maximum concurrent connections
        .max_connections(config.db_max_connections)
        // Timeout waiting for connection from pool
        .acquire_timeout(Duration::from_secs(config.db_connection_timeout))
        // Connection idle timeout (5 minutes)
        .idle_timeout(Duration::from_secs(300))
        // Connection lifetime (30 minutes before recycle)
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    // Verify connection works
    sqlx::query("SELECT 1").execute(&pool).await?;

    log::info!("Database pool initialized successfully");
    Ok(pool)
}

/// Build the data source selected by DATA_SOURCE
/// DOCUMENTATION: PostgreSQL tables are created if absent
pub async fn init_data_source(config: &Config) -> Result<Arc<dyn DataSource>, DataSourceError> {
    let kind = config.data_source_kind().map_err(|message| DataSourceError::Malformed {
        table: "-",
        message,
    })?;

    let source: Arc<dyn DataSource> = match kind {
        DataSourceKind::Memory => Arc::new(MemoryDataSource::new()),
        DataSourceKind::Postgres => {
            let pool = init_db_pool(config).await?;
            let source = PgDataSource::new(pool);
            source.ensure_tables(&[Photo::TABLE, Comment::TABLE]).await?;
            Arc::new(source)
        }
    };

    log::info!("Using {} data source", source.name());
    Ok(source)
}
