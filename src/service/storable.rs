//! Storable capability: CRUD for one model, forwarded to the storage handle it is bound to.

use crate::config::ResolvedModel;
use crate::error::{AppError, ConfigError};
use crate::service::RequestValidator;
use crate::storage::{Record, StorageHandle};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Transformation applied to a new instance's fields just before it is stored.
#[derive(Clone)]
pub struct CreateHook(pub Arc<dyn Fn(&mut Map<String, Value>) + Send + Sync>);

impl fmt::Debug for CreateHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CreateHook")
    }
}

#[derive(Clone)]
pub struct Storable {
    model: Arc<ResolvedModel>,
    storage: Option<StorageHandle>,
}

impl Storable {
    pub fn unbound(model: Arc<ResolvedModel>) -> Self {
        Storable { model, storage: None }
    }

    pub fn bound(model: Arc<ResolvedModel>, storage: StorageHandle) -> Self {
        Storable {
            model,
            storage: Some(storage),
        }
    }

    /// Attach the storage handle. A handle can be bound exactly once.
    pub fn bind(&mut self, storage: StorageHandle) -> Result<(), ConfigError> {
        if self.storage.is_some() {
            return Err(ConfigError::AlreadyBound(self.model.name.clone()));
        }
        self.storage = Some(storage);
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.storage.is_some()
    }

    pub fn model(&self) -> &Arc<ResolvedModel> {
        &self.model
    }

    fn engine(&self) -> Result<&StorageHandle, AppError> {
        self.storage
            .as_ref()
            .ok_or_else(|| ConfigError::Unbound(self.model.name.clone()).into())
    }

    pub async fn create_table(&self) -> Result<(), AppError> {
        self.engine()?.create_table(&self.model).await
    }

    /// Keep declared fields, drop null optionals, fill defaults, validate, then store.
    pub async fn create(&self, instance: Map<String, Value>) -> Result<Record, AppError> {
        let engine = self.engine()?;
        let mut fields = Map::new();
        let mut instance = instance;
        for f in &self.model.fields {
            match instance.remove(&f.name) {
                Some(Value::Null) | None => {
                    if let Some(default) = &f.default {
                        fields.insert(f.name.clone(), default.clone());
                    }
                }
                Some(v) => {
                    fields.insert(f.name.clone(), v);
                }
            }
        }
        RequestValidator::validate(&fields, &self.model.fields)?;
        RequestValidator::coerce_floats(&mut fields, &self.model.fields);
        if let Some(hook) = &self.model.on_create {
            (hook.0)(&mut fields);
        }
        engine.create(&self.model, fields).await
    }

    /// Like [`Storable::create`] for an arbitrary JSON value; non-objects are a validation error.
    pub async fn create_value(&self, instance: Value) -> Result<Record, AppError> {
        self.create(into_object(instance)?).await
    }

    pub async fn list(&self) -> Result<Vec<Record>, AppError> {
        self.engine()?.list(&self.model).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Record>, AppError> {
        self.engine()?.get(&self.model, id).await
    }

    pub async fn update(&self, id: i64, mut partial: Map<String, Value>) -> Result<Option<Record>, AppError> {
        let engine = self.engine()?;
        RequestValidator::validate_partial(&partial, &self.model.fields)?;
        RequestValidator::coerce_floats(&mut partial, &self.model.fields);
        engine.update(&self.model, id, partial).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        self.engine()?.delete(&self.model, id).await
    }
}

impl fmt::Debug for Storable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storable")
            .field("model", &self.model.name)
            .field("storage", &self.storage.as_ref().map(|s| s.name()))
            .finish()
    }
}

pub(crate) fn into_object(v: Value) -> Result<Map<String, Value>, AppError> {
    match v {
        Value::Object(m) => Ok(m),
        other => Err(AppError::Validation(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, FieldConfig, ModelConfig};
    use crate::storage::{JsonFileStorage, SqliteStorage};
    use serde_json::json;

    fn product() -> Arc<ResolvedModel> {
        let catalog = resolve(&[ModelConfig::new("Product")
            .storable()
            .field(FieldConfig::new("name", "str"))
            .field(FieldConfig::new("price", "float"))
            .field(FieldConfig::new("description", "str").with_default(json!("")))
            .field(FieldConfig::new("sku", "str").optional())
            .on_create(|fields| {
                if let Some(Value::String(name)) = fields.get_mut("name") {
                    *name = name.trim().to_string();
                }
            })])
        .unwrap();
        catalog.model("Product").unwrap().clone()
    }

    async fn bound_product() -> Storable {
        let engine: StorageHandle = Arc::new(SqliteStorage::in_memory().await.unwrap());
        let storable = Storable::bound(product(), engine);
        storable.create_table().await.unwrap();
        storable
    }

    #[tokio::test]
    async fn unbound_use_is_a_configuration_error() {
        let storable = Storable::unbound(product());
        let err = storable.list().await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Unbound(_))));
    }

    #[tokio::test]
    async fn binding_twice_is_rejected() {
        let engine: StorageHandle = Arc::new(SqliteStorage::in_memory().await.unwrap());
        let mut storable = Storable::unbound(product());
        storable.bind(engine.clone()).unwrap();
        assert!(storable.is_bound());
        assert!(matches!(storable.bind(engine), Err(ConfigError::AlreadyBound(_))));
    }

    #[tokio::test]
    async fn create_applies_defaults_hooks_and_drops_unknown_keys() {
        let storable = bound_product().await;
        let rec = storable
            .create_value(json!({"name": "  Pen ", "price": 2.5, "colour": "blue", "sku": null}))
            .await
            .unwrap();
        assert_eq!(rec.get("name"), Some(&json!("Pen")));
        assert_eq!(rec.get("description"), Some(&json!("")));
        assert_eq!(rec.get("sku"), Some(&Value::Null));
        assert!(rec.get("colour").is_none());
    }

    #[tokio::test]
    async fn create_rejects_missing_and_mistyped_fields() {
        let storable = bound_product().await;
        assert!(matches!(
            storable.create_value(json!({"name": "Pen"})).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            storable.create_value(json!({"name": "Pen", "price": "cheap"})).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(storable.create_value(json!([1, 2])).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn update_type_checks_before_forwarding() {
        let storable = bound_product().await;
        let rec = storable.create_value(json!({"name": "Pen", "price": 1.0})).await.unwrap();
        let err = storable
            .update(rec.id, json!({"price": "free"}).as_object().cloned().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = storable
            .update(rec.id, json!({"price": 3.5}).as_object().cloned().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get("price"), Some(&json!(3.5)));
        assert!(storable.delete(rec.id).await.unwrap());
        assert!(storable.get(rec.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn both_engines_return_integral_prices_as_floats() {
        let dir = tempfile::tempdir().unwrap();
        let engines: Vec<StorageHandle> = vec![
            Arc::new(SqliteStorage::in_memory().await.unwrap()),
            Arc::new(JsonFileStorage::open(dir.path()).await.unwrap()),
        ];
        let mut seen = Vec::new();
        for engine in engines {
            let storable = Storable::bound(product(), engine);
            storable.create_table().await.unwrap();
            let rec = storable.create_value(json!({"name": "Pen", "price": 10})).await.unwrap();
            let fetched = storable.get(rec.id).await.unwrap().unwrap();
            assert_eq!(fetched, rec);
            let updated = storable
                .update(rec.id, json!({"price": 12}).as_object().cloned().unwrap())
                .await
                .unwrap()
                .unwrap();
            assert!(updated.get("price").unwrap().is_f64());
            seen.push(serde_json::to_value(&fetched).unwrap());
        }
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[0]["price"], json!(10.0));
    }
}
