//! Blueprint server: the sample models plus any JSON declarations from `MODELS_DIR`,
//! persisted in the storage engine chosen by `BLUEPRINT_STORAGE`.
//!
//! Run from repo root: `cargo run -p blueprint-server`

use blueprint_sdk::{
    build_router_with, init_tracing, load_from_dir, resolve, samples, Registry, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_tracing("blueprint_sdk=info,blueprint_server=info");

    let mut configs = samples::all();
    if let Some(dir) = &settings.models_dir {
        let loaded = load_from_dir(dir).await?;
        tracing::info!(dir = %dir.display(), models = loaded.len(), "loaded model declarations");
        configs.extend(loaded);
    }
    let catalog = resolve(&configs)?;

    let storage = settings.open_storage().await?;
    tracing::info!(engine = storage.name(), "storage ready");

    let mut registry = Registry::new(catalog);
    registry.register_all(Some(storage)).await?;

    let app = build_router_with(Arc::new(registry), settings.body_limit, None)?;
    let listener = TcpListener::bind(settings.bind_addr()).await?;
    tracing::info!("blueprint server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
