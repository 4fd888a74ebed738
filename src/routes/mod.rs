mod common;
mod model;
mod synthesize;

pub use common::common_routes;
pub use model::model_routes;
pub use synthesize::{synthesize, RouteEntry, RouteIntent, RouteTable};

use crate::error::ConfigError;
use crate::registry::Registry;
use crate::response::error_body;
use crate::state::AppState;
use axum::{http::StatusCode, http::Uri, Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{self, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Request bodies above this size are rejected with 413.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

async fn fallback(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(error_body("not_found", format!("no route for {}", uri.path()), None)),
    )
}

/// Synthesize routes from the registry and bind model plus common routes.
pub fn build_router(registry: Arc<Registry>) -> Result<Router, ConfigError> {
    build_router_with(registry, DEFAULT_BODY_LIMIT, None)
}

pub fn build_router_with(
    registry: Arc<Registry>,
    body_limit: usize,
    cors: Option<CorsLayer>,
) -> Result<Router, ConfigError> {
    let routes = synthesize(&registry)?;
    tracing::info!(routes = routes.len(), models = registry.len(), "binding routes");
    let state = AppState {
        registry,
        routes: Arc::new(routes),
    };
    let cors = cors.unwrap_or_else(|| {
        CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(cors::Any)
            .allow_headers(cors::Any)
    });
    Ok(Router::new()
        .merge(common_routes(state.clone()))
        .merge(model_routes(state))
        .fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(body_limit))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        ))
}
