//! Blueprint SDK: declarative models served as a REST backend over pluggable storage.

pub mod config;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod response;
pub mod routes;
pub mod samples;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod storage;

pub use config::{load_from_dir, resolve, ActionConfig, FieldConfig, ModelCatalog, ModelConfig, ResolvedModel};
pub use error::{AppError, ConfigError, StorageError};
pub use registry::{Registry, RegistryEntry};
pub use response::error_body;
pub use routes::{build_router, build_router_with, common_routes, model_routes, synthesize, RouteTable};
pub use schema::{describe, SchemaDocument};
pub use service::{ActionContext, ActionOutput, Storable};
pub use settings::{init_tracing, Settings, StorageKind};
pub use state::AppState;
pub use storage::{JsonFileStorage, Record, SqliteStorage, StorageEngine, StorageHandle};
