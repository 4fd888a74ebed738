//! Model registry: table name → model plus its storable capability.

use crate::config::{ModelCatalog, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::service::Storable;
use crate::storage::StorageHandle;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct RegistryEntry {
    pub model: Arc<ResolvedModel>,
    /// Present exactly when the model is storable.
    pub storable: Option<Storable>,
}

/// Built once at bootstrap, then shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct Registry {
    catalog: Arc<ModelCatalog>,
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    pub fn new(catalog: impl Into<Arc<ModelCatalog>>) -> Self {
        Registry {
            catalog: catalog.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Register a model under its table name, replacing any previous entry.
    /// Storable models are bound to `storage` and their table is created.
    pub async fn register(
        &mut self,
        model: Arc<ResolvedModel>,
        storage: Option<StorageHandle>,
    ) -> Result<(), AppError> {
        if self.catalog.model(&model.name).is_none() {
            return Err(ConfigError::MissingReference {
                kind: "model",
                id: model.name.clone(),
            }
            .into());
        }

        let storable = if model.storable {
            let storage = storage.ok_or_else(|| ConfigError::MissingStorage(model.name.clone()))?;
            let storable = Storable::bound(model.clone(), storage);
            storable.create_table().await?;
            Some(storable)
        } else {
            None
        };

        tracing::info!(
            model = %model.name,
            table = %model.table,
            storable = model.storable,
            "registered model"
        );
        self.entries.insert(
            model.table.clone(),
            RegistryEntry {
                model,
                storable,
            },
        );
        Ok(())
    }

    /// Register every model of the catalog against one storage handle.
    pub async fn register_all(&mut self, storage: Option<StorageHandle>) -> Result<(), AppError> {
        let models = self.catalog.models.clone();
        for model in models {
            self.register(model, storage.clone()).await?;
        }
        Ok(())
    }

    pub fn entry(&self, table: &str) -> Option<&RegistryEntry> {
        self.entries.get(table)
    }

    /// Entries in table-name order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn storable(&self, table: &str) -> Result<&Storable, AppError> {
        let entry = self
            .entry(table)
            .ok_or_else(|| AppError::NotFound(format!("model {}", table)))?;
        entry
            .storable
            .as_ref()
            .ok_or_else(|| ConfigError::NotStorable(entry.model.name.clone()).into())
    }
}
