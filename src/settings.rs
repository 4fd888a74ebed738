//! Process settings from environment variables (a `.env` file is honoured via dotenvy).

use crate::error::{AppError, ConfigError};
use crate::routes::DEFAULT_BODY_LIMIT;
use crate::storage::{JsonFileStorage, SqliteStorage, StorageHandle};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Sqlite,
    Json,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageKind::Sqlite),
            "json" => Ok(StorageKind::Json),
            other => Err(ConfigError::Validation(format!(
                "BLUEPRINT_STORAGE must be sqlite or json, got '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub storage: StorageKind,
    pub database_url: String,
    pub data_dir: PathBuf,
    /// Directory of JSON model declarations loaded next to the built-in ones.
    pub models_dir: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub body_limit: usize,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("BLUEPRINT_STORAGE") {
            Some(s) => s.parse()?,
            None => StorageKind::Sqlite,
        };
        let port = match lookup("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| ConfigError::Validation(format!("PORT must be a port number, got '{}'", p)))?,
            None => 8000,
        };
        let body_limit = match lookup("BODY_LIMIT_BYTES") {
            Some(b) => b
                .parse()
                .map_err(|_| ConfigError::Validation(format!("BODY_LIMIT_BYTES must be an integer, got '{}'", b)))?,
            None => DEFAULT_BODY_LIMIT,
        };
        Ok(Settings {
            storage,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://blueprint.db".into()),
            data_dir: lookup("DATA_DIR").unwrap_or_else(|| "data".into()).into(),
            models_dir: lookup("MODELS_DIR").filter(|s| !s.is_empty()).map(PathBuf::from),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            body_limit,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the configured storage engine.
    pub async fn open_storage(&self) -> Result<StorageHandle, AppError> {
        let handle: StorageHandle = match self.storage {
            StorageKind::Sqlite => Arc::new(SqliteStorage::connect(&self.database_url).await?),
            StorageKind::Json => Arc::new(JsonFileStorage::open(&self.data_dir).await?),
        };
        Ok(handle)
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `default_directive`.
pub fn init_tracing(default_directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.storage, StorageKind::Sqlite);
        assert_eq!(s.database_url, "sqlite://blueprint.db");
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert!(s.models_dir.is_none());
        assert_eq!(s.bind_addr(), "0.0.0.0:8000");
        assert_eq!(s.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn overrides_and_errors() {
        let s = settings(&[("BLUEPRINT_STORAGE", "JSON"), ("PORT", "9000"), ("MODELS_DIR", "models")]).unwrap();
        assert_eq!(s.storage, StorageKind::Json);
        assert_eq!(s.port, 9000);
        assert_eq!(s.models_dir, Some(PathBuf::from("models")));

        assert!(settings(&[("BLUEPRINT_STORAGE", "postgres")]).is_err());
        assert!(settings(&[("PORT", "eighty")]).is_err());
    }

    #[tokio::test]
    async fn opens_json_storage_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("store");
        let s = settings(&[("BLUEPRINT_STORAGE", "json"), ("DATA_DIR", data.to_str().unwrap())]).unwrap();
        let engine = s.open_storage().await.unwrap();
        assert_eq!(engine.name(), "json");
        assert!(data.is_dir());
    }
}
