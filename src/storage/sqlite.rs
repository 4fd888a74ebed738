//! Embedded relational engine: one SQLite table per model.

use super::{updatable_fields, Record, StorageEngine};
use crate::config::{FieldType, ResolvedModel, ID_FIELD};
use crate::error::{AppError, StorageError};
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStorage { pool }
    }

    /// Connect by URL (e.g. `sqlite://app.db`), creating the file if missing.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        tracing::info!(url = %url, "sqlite storage connected");
        Ok(SqliteStorage::new(pool))
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        tracing::info!(path = %path.as_ref().display(), "sqlite storage opened");
        Ok(SqliteStorage::new(pool))
    }

    /// Private in-memory database. A single connection that never expires, since each
    /// connection to `:memory:` is its own database.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(SqliteStorage::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_optional(&self, q: QueryBuf) -> Result<Option<SqliteRow>, AppError> {
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }
}

/// Decode a row by the declared field types.
fn decode_row(model: &ResolvedModel, row: &SqliteRow) -> Result<Record, AppError> {
    let id: i64 = row.try_get(ID_FIELD)?;
    let mut fields = Map::new();
    for f in &model.fields {
        let name = f.name.as_str();
        let value = match &f.ty {
            FieldType::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
            FieldType::Float => row.try_get::<Option<f64>, _>(name)?.map(Value::from),
            FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::from),
            FieldType::String | FieldType::Opaque(_) => row.try_get::<Option<String>, _>(name)?.map(Value::from),
            FieldType::Object | FieldType::List(_) | FieldType::Model(_) => {
                match row.try_get::<Option<String>, _>(name)? {
                    Some(text) => Some(serde_json::from_str::<Value>(&text).map_err(|e| StorageError::Corrupt {
                        table: model.table.clone(),
                        reason: format!("column {}: {}", name, e),
                    })?),
                    None => None,
                }
            }
        };
        fields.insert(f.name.clone(), value.unwrap_or(Value::Null));
    }
    Ok(Record { id, fields })
}

#[async_trait]
impl StorageEngine for SqliteStorage {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn create_table(&self, model: &ResolvedModel) -> Result<(), AppError> {
        let q = sql::create_table(model);
        tracing::debug!(table = %model.table, sql = %q.sql, "create table");
        sqlx::query(&q.sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn create(&self, model: &ResolvedModel, fields: Map<String, Value>) -> Result<Record, AppError> {
        let q = sql::insert(model, &fields)?;
        let row = self.fetch_optional(q).await?.ok_or_else(|| StorageError::Corrupt {
            table: model.table.clone(),
            reason: "insert returned no row".into(),
        })?;
        let record = decode_row(model, &row)?;
        tracing::debug!(table = %model.table, id = record.id, "created record");
        Ok(record)
    }

    async fn list(&self, model: &ResolvedModel) -> Result<Vec<Record>, AppError> {
        let q = sql::select_all(model);
        let rows = sqlx::query(&q.sql).fetch_all(&self.pool).await?;
        rows.iter().map(|row| decode_row(model, row)).collect()
    }

    async fn get(&self, model: &ResolvedModel, id: i64) -> Result<Option<Record>, AppError> {
        let row = self.fetch_optional(sql::select_by_id(model, id)).await?;
        row.map(|r| decode_row(model, &r)).transpose()
    }

    async fn update(
        &self,
        model: &ResolvedModel,
        id: i64,
        partial: Map<String, Value>,
    ) -> Result<Option<Record>, AppError> {
        let fields = updatable_fields(model, partial)?;
        let row = self.fetch_optional(sql::update(model, id, &fields)?).await?;
        row.map(|r| decode_row(model, &r)).transpose()
    }

    async fn delete(&self, model: &ResolvedModel, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(model, id);
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
