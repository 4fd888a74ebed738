//! Storage engine contract and the two engines behind it.

mod json_file;
mod sqlite;

pub use json_file::JsonFileStorage;
pub use sqlite::SqliteStorage;

use crate::config::{ResolvedModel, ID_FIELD};
use crate::error::{AppError, StorageError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// One persisted instance: the synthetic id plus the model's fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Typed instance for `model`: declared fields only, absent ones as null.
    pub fn typed(model: &ResolvedModel, id: i64, fields: Map<String, Value>) -> Self {
        Record {
            id,
            fields: model.project(fields),
        }
    }

    /// Split a stored JSON object into id and fields.
    pub(crate) fn from_stored(model: &ResolvedModel, mut obj: Map<String, Value>) -> Result<Self, StorageError> {
        let id = obj
            .remove(ID_FIELD)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| StorageError::Corrupt {
                table: model.table.clone(),
                reason: "record without integer id".into(),
            })?;
        Ok(Record::typed(model, id, obj))
    }
}

/// CRUD contract every backend satisfies. Absent ids are signalled with `None`/`false`,
/// never with an error.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Ensure durable space exists for the model. Idempotent.
    async fn create_table(&self, model: &ResolvedModel) -> Result<(), AppError>;

    /// Store `fields` under the next identifier and return the populated record.
    async fn create(&self, model: &ResolvedModel, fields: Map<String, Value>) -> Result<Record, AppError>;

    async fn list(&self, model: &ResolvedModel) -> Result<Vec<Record>, AppError>;

    async fn get(&self, model: &ResolvedModel, id: i64) -> Result<Option<Record>, AppError>;

    /// Apply the declared fields present in `partial`. `Validation` when none of the keys is
    /// a declared field; `None` when the id does not exist.
    async fn update(
        &self,
        model: &ResolvedModel,
        id: i64,
        partial: Map<String, Value>,
    ) -> Result<Option<Record>, AppError>;

    /// Remove the record. Returns whether one existed.
    async fn delete(&self, model: &ResolvedModel, id: i64) -> Result<bool, AppError>;
}

/// Shared reference to the engine backing a model.
pub type StorageHandle = Arc<dyn StorageEngine>;

/// Keep only the keys of `partial` the model declares; error when nothing is left.
pub(crate) fn updatable_fields(
    model: &ResolvedModel,
    partial: Map<String, Value>,
) -> Result<Map<String, Value>, AppError> {
    let fields: Map<String, Value> = partial
        .into_iter()
        .filter(|(k, _)| k != ID_FIELD && model.field(k).is_some())
        .collect();
    if fields.is_empty() {
        return Err(AppError::Validation(format!(
            "no valid fields provided to update {}",
            model.name
        )));
    }
    Ok(fields)
}
