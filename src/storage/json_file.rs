//! File-backed engine: one `<table>.json` per model holding a JSON array of record objects.

use super::{updatable_fields, Record, StorageEngine};
use crate::config::{ResolvedModel, ID_FIELD};
use crate::error::{AppError, StorageError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
struct TableState {
    /// Highest id ever handed out by this instance. Survives deletes, so ids are not revisited.
    high_water: i64,
}

pub struct JsonFileStorage {
    dir: PathBuf,
    tables: Mutex<HashMap<String, Arc<AsyncMutex<TableState>>>>,
}

impl JsonFileStorage {
    /// Open (creating if needed) the data directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!(dir = %dir.display(), "json file storage ready");
        Ok(JsonFileStorage {
            dir,
            tables: Mutex::new(HashMap::new()),
        })
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.json", table))
    }

    /// Per-table lock serializing every read-modify-write, id assignment included.
    fn table_lock(&self, table: &str) -> Arc<AsyncMutex<TableState>> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.entry(table.to_string()).or_default().clone()
    }

    async fn read_rows(&self, model: &ResolvedModel) -> Result<Vec<Map<String, Value>>, AppError> {
        let path = self.table_path(&model.table);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let rows: Vec<Value> = serde_json::from_str(&text).map_err(|e| corrupt(model, e.to_string()))?;
        rows.into_iter()
            .map(|row| match row {
                Value::Object(obj) if obj.get(ID_FIELD).and_then(Value::as_i64).is_some() => Ok(obj),
                _ => Err(corrupt(model, "record is not an object with an integer id".into())),
            })
            .collect()
    }

    /// Write via a temp file and rename so readers never observe a partial file.
    async fn write_rows(&self, model: &ResolvedModel, rows: &[Map<String, Value>]) -> Result<(), AppError> {
        let path = self.table_path(&model.table);
        let tmp = self.dir.join(format!(".{}.json.tmp", model.table));
        let text = serde_json::to_string_pretty(rows).map_err(|e| corrupt(model, e.to_string()))?;
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(table = %model.table, rows = rows.len(), "wrote table file");
        Ok(())
    }
}

fn corrupt(model: &ResolvedModel, reason: String) -> AppError {
    AppError::Storage(StorageError::Corrupt {
        table: model.table.clone(),
        reason,
    })
}

fn row_id(row: &Map<String, Value>) -> i64 {
    row.get(ID_FIELD).and_then(Value::as_i64).unwrap_or(0)
}

#[async_trait]
impl StorageEngine for JsonFileStorage {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn create_table(&self, model: &ResolvedModel) -> Result<(), AppError> {
        let lock = self.table_lock(&model.table);
        let mut state = lock.lock().await;
        let path = self.table_path(&model.table);
        if tokio::fs::try_exists(&path).await? {
            let rows = self.read_rows(model).await?;
            state.high_water = state.high_water.max(rows.iter().map(row_id).max().unwrap_or(0));
        } else {
            self.write_rows(model, &[]).await?;
        }
        Ok(())
    }

    async fn create(&self, model: &ResolvedModel, fields: Map<String, Value>) -> Result<Record, AppError> {
        let lock = self.table_lock(&model.table);
        let mut state = lock.lock().await;
        let mut rows = self.read_rows(model).await?;
        let file_max = rows.iter().map(row_id).max().unwrap_or(0);
        let id = state
            .high_water
            .max(file_max)
            .checked_add(1)
            .ok_or_else(|| StorageError::Corrupt {
                table: model.table.clone(),
                reason: "record ids exhausted".into(),
            })?;

        let mut row = Map::new();
        row.insert(ID_FIELD.to_string(), Value::from(id));
        row.extend(fields.clone());
        rows.push(row);
        self.write_rows(model, &rows).await?;
        state.high_water = id;

        tracing::debug!(table = %model.table, id, "created record");
        Ok(Record::typed(model, id, fields))
    }

    async fn list(&self, model: &ResolvedModel) -> Result<Vec<Record>, AppError> {
        let rows = self.read_rows(model).await?;
        rows.into_iter()
            .map(|row| Record::from_stored(model, row).map_err(AppError::from))
            .collect()
    }

    async fn get(&self, model: &ResolvedModel, id: i64) -> Result<Option<Record>, AppError> {
        let rows = self.read_rows(model).await?;
        match rows.into_iter().find(|row| row_id(row) == id) {
            Some(row) => Ok(Some(Record::from_stored(model, row)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        model: &ResolvedModel,
        id: i64,
        partial: Map<String, Value>,
    ) -> Result<Option<Record>, AppError> {
        let fields = updatable_fields(model, partial)?;
        let lock = self.table_lock(&model.table);
        let _state = lock.lock().await;
        let mut rows = self.read_rows(model).await?;
        let Some(row) = rows.iter_mut().find(|row| row_id(row) == id) else {
            return Ok(None);
        };
        row.extend(fields);
        let updated = row.clone();
        self.write_rows(model, &rows).await?;
        Ok(Some(Record::from_stored(model, updated)?))
    }

    async fn delete(&self, model: &ResolvedModel, id: i64) -> Result<bool, AppError> {
        let lock = self.table_lock(&model.table);
        let _state = lock.lock().await;
        let mut rows = self.read_rows(model).await?;
        let before = rows.len();
        rows.retain(|row| row_id(row) != id);
        if rows.len() == before {
            return Ok(false);
        }
        self.write_rows(model, &rows).await?;
        Ok(true)
    }
}
