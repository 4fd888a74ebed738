//! Common routes: health, version, route table, OpenAPI document.

use crate::routes::RouteTable;
use crate::schema::openapi::openapi;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::openapi::OpenApi;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    models: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        models: state.registry.len(),
    })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn routes(State(state): State<AppState>) -> Json<RouteTable> {
    Json(state.routes.as_ref().clone())
}

async fn openapi_doc(State(state): State<AppState>) -> Json<OpenApi> {
    Json(openapi(
        state.registry.catalog(),
        &state.routes,
        env!("CARGO_PKG_VERSION"),
    ))
}

/// GET /health, GET /version, GET /routes, GET /openapi.json.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/routes", get(routes))
        .route("/openapi.json", get(openapi_doc))
        .with_state(state)
}
