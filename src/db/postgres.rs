// src/db/postgres.rs
// DOCUMENTATION: PostgreSQL data source
// PURPOSE: Persist each entity as a JSONB document in its own table

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder};

use super::datasource::{DataSource, DataSourceError, Document, Reference};
use super::filter::{Condition, Filter, Where};

/// Row shape shared by every entity table
#[derive(Debug, FromRow)]
struct RecordRow {
    id: i64,
    data: Json<Document>,
}

impl RecordRow {
    fn into_document(self) -> Document {
        let mut doc = self.data.0;
        doc.insert("id".to_string(), Value::from(self.id));
        doc
    }
}

/// PostgreSQL connector
/// DOCUMENTATION: Tables look like `(id BIGSERIAL PRIMARY KEY, data JSONB)`.
/// Filter values are always bound, table names come from entity metadata.
#[derive(Clone)]
pub struct PgDataSource {
    pool: PgPool,
}

impl PgDataSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create entity tables that do not exist yet
    pub async fn ensure_tables(&self, tables: &[&'static str]) -> Result<(), DataSourceError> {
        for table in tables {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id BIGSERIAL PRIMARY KEY,
                    data JSONB NOT NULL DEFAULT '{{}}'::jsonb
                )",
                table
            );
            sqlx::query(&ddl).execute(&self.pool).await.map_err(|e| {
                log::error!("Failed to create table {}: {}", table, e);
                DataSourceError::from(e)
            })?;
            log::info!("Table ready: {}", table);
        }
        Ok(())
    }
}

/// Push the JSONB expression for one property
fn push_property(qb: &mut QueryBuilder<'_, Postgres>, name: &str) {
    if name == "id" {
        qb.push("to_jsonb(id)");
    } else {
        qb.push("(data -> ");
        qb.push_bind(name.to_string());
        qb.push("::text)");
    }
}

fn push_list(qb: &mut QueryBuilder<'_, Postgres>, values: &[Value]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(Json(value.clone()));
    }
    separated.push_unseparated(")");
}

/// Compile a where clause into SQL with bound parameters
fn push_where(qb: &mut QueryBuilder<'_, Postgres>, clause: &Where) {
    match clause {
        Where::And(items) | Where::Or(items) if items.is_empty() => {
            qb.push(if matches!(clause, Where::And(_)) { "TRUE" } else { "FALSE" });
        }
        Where::And(items) | Where::Or(items) => {
            let joiner = if matches!(clause, Where::And(_)) { " AND " } else { " OR " };
            qb.push("(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    qb.push(joiner);
                }
                push_where(qb, item);
            }
            qb.push(")");
        }
        Where::Field { name, condition } => push_condition(qb, name, condition),
    }
}

fn push_comparison(qb: &mut QueryBuilder<'_, Postgres>, name: &str, op: &str, value: &Value) {
    push_property(qb, name);
    qb.push(op);
    qb.push_bind(Json(value.clone()));
}

fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, name: &str, condition: &Condition) {
    match condition {
        Condition::Eq(Value::Null) => {
            qb.push("(");
            push_property(qb, name);
            qb.push(" IS NULL OR ");
            push_property(qb, name);
            qb.push(" = 'null'::jsonb)");
        }
        Condition::Neq(Value::Null) => {
            qb.push("(");
            push_property(qb, name);
            qb.push(" IS NOT NULL AND ");
            push_property(qb, name);
            qb.push(" <> 'null'::jsonb)");
        }
        Condition::Eq(value) => push_comparison(qb, name, " = ", value),
        Condition::Neq(value) => {
            qb.push("(");
            push_property(qb, name);
            qb.push(" IS NULL OR ");
            push_comparison(qb, name, " <> ", value);
            qb.push(")");
        }
        Condition::Gt(value) => push_comparison(qb, name, " > ", value),
        Condition::Gte(value) => push_comparison(qb, name, " >= ", value),
        Condition::Lt(value) => push_comparison(qb, name, " < ", value),
        Condition::Lte(value) => push_comparison(qb, name, " <= ", value),
        Condition::Inq(values) if values.is_empty() => {
            qb.push("FALSE");
        }
        Condition::Inq(values) => {
            push_property(qb, name);
            qb.push(" IN ");
            push_list(qb, values);
        }
        Condition::Nin(values) if values.is_empty() => {
            qb.push("TRUE");
        }
        Condition::Nin(values) => {
            qb.push("(");
            push_property(qb, name);
            qb.push(" IS NULL OR ");
            push_property(qb, name);
            qb.push(" NOT IN ");
            push_list(qb, values);
            qb.push(")");
        }
    }
}

fn push_optional_where(qb: &mut QueryBuilder<'_, Postgres>, where_: Option<&Where>) {
    if let Some(clause) = where_ {
        qb.push(" WHERE ");
        push_where(qb, clause);
    }
}

/// Build the SELECT for `find`
fn select_query<'q>(table: &str, filter: &Filter) -> QueryBuilder<'q, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT id, data FROM {}", table));
    push_optional_where(&mut qb, filter.where_.as_ref());

    qb.push(" ORDER BY ");
    for order in &filter.order {
        push_property(&mut qb, &order.field);
        qb.push(if order.descending {
            " DESC NULLS LAST, "
        } else {
            " ASC NULLS FIRST, "
        });
    }
    qb.push("id ASC");

    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    if filter.skip > 0 {
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(filter.skip).unwrap_or(i64::MAX));
    }
    qb
}

/// Build the guarded INSERT used by `create_referencing`
/// DOCUMENTATION: `FOR KEY SHARE` holds each parent row until the insert
/// commits, so a concurrent parent delete waits and its cascade sees the row.
fn guarded_insert<'q>(
    table: &str,
    data: Document,
    references: &[Reference],
) -> QueryBuilder<'q, Postgres> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO {} (data) SELECT ", table));
    qb.push_bind(Json(data));
    for (i, reference) in references.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(format!("EXISTS (SELECT 1 FROM {} WHERE id = ", reference.table));
        qb.push_bind(reference.id);
        qb.push(" FOR KEY SHARE)");
    }
    qb.push(" RETURNING id, data");
    qb
}

fn without_id(mut doc: Document) -> Document {
    doc.remove("id");
    doc
}

#[async_trait]
impl DataSource for PgDataSource {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn create(
        &self,
        table: &'static str,
        data: Document,
    ) -> Result<Document, DataSourceError> {
        let sql = format!("INSERT INTO {} (data) VALUES ($1) RETURNING id, data", table);
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(Json(without_id(data)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Failed to insert into {}: {}", table, e);
                DataSourceError::from(e)
            })?;
        Ok(row.into_document())
    }

    async fn create_referencing(
        &self,
        table: &'static str,
        data: Document,
        references: &[Reference],
    ) -> Result<Option<Document>, DataSourceError> {
        let mut qb = guarded_insert(table, without_id(data), references);
        let row = qb
            .build_query_as::<RecordRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Guarded insert into {} failed: {}", table, e);
                DataSourceError::from(e)
            })?;
        Ok(row.map(RecordRow::into_document))
    }

    async fn find(
        &self,
        table: &'static str,
        filter: &Filter,
    ) -> Result<Vec<Document>, DataSourceError> {
        let mut qb = select_query(table, filter);
        log::debug!("Executing find: {}", qb.sql());
        let rows = qb
            .build_query_as::<RecordRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Find on {} failed: {}", table, e);
                DataSourceError::from(e)
            })?;
        Ok(rows.into_iter().map(RecordRow::into_document).collect())
    }

    async fn find_by_id(
        &self,
        table: &'static str,
        id: i64,
    ) -> Result<Option<Document>, DataSourceError> {
        let sql = format!("SELECT id, data FROM {} WHERE id = $1", table);
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Failed to fetch {} {}: {}", table, id, e);
                DataSourceError::from(e)
            })?;
        Ok(row.map(RecordRow::into_document))
    }

    async fn count(
        &self,
        table: &'static str,
        where_: Option<&Where>,
    ) -> Result<u64, DataSourceError> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", table));
        push_optional_where(&mut qb, where_);
        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Count on {} failed: {}", table, e);
                DataSourceError::from(e)
            })?;
        Ok(count as u64)
    }

    async fn update_by_id(
        &self,
        table: &'static str,
        id: i64,
        patch: Document,
    ) -> Result<bool, DataSourceError> {
        let sql = format!("UPDATE {} SET data = data || $1 WHERE id = $2", table);
        let result = sqlx::query(&sql)
            .bind(Json(without_id(patch)))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Update of {} {} failed: {}", table, id, e);
                DataSourceError::from(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_by_id(
        &self,
        table: &'static str,
        id: i64,
        data: Document,
    ) -> Result<bool, DataSourceError> {
        let sql = format!("UPDATE {} SET data = $1 WHERE id = $2", table);
        let result = sqlx::query(&sql)
            .bind(Json(without_id(data)))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Replace of {} {} failed: {}", table, id, e);
                DataSourceError::from(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, table: &'static str, id: i64) -> Result<bool, DataSourceError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Delete of {} {} failed: {}", table, id, e);
                DataSourceError::from(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_all(
        &self,
        table: &'static str,
        where_: Option<&Where>,
        patch: Document,
    ) -> Result<u64, DataSourceError> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET data = data || ", table));
        qb.push_bind(Json(without_id(patch)));
        push_optional_where(&mut qb, where_);
        let result = qb.build().execute(&self.pool).await.map_err(|e| {
            log::error!("Bulk update on {} failed: {}", table, e);
            DataSourceError::from(e)
        })?;
        Ok(result.rows_affected())
    }

    async fn delete_all(
        &self,
        table: &'static str,
        where_: Option<&Where>,
    ) -> Result<u64, DataSourceError> {
        let mut qb = QueryBuilder::new(format!("DELETE FROM {}", table));
        push_optional_where(&mut qb, where_);
        let result = qb.build().execute(&self.pool).await.map_err(|e| {
            log::error!("Bulk delete on {} failed: {}", table, e);
            DataSourceError::from(e)
        })?;
        Ok(result.rows_affected())
    }
}
