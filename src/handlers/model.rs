//! Model handlers: schema, create, list, read, update, delete, exposed actions.
//! Each takes the table name the route was synthesized for.

use crate::error::AppError;
use crate::response;
use crate::schema::{describe, SchemaDocument};
use crate::service::{action, into_object};
use crate::state::AppState;
use crate::storage::Record;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

fn not_found(table: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} {}", table, id))
}

pub async fn schema(state: AppState, table: &str) -> Result<Json<SchemaDocument>, AppError> {
    let entry = state
        .registry
        .entry(table)
        .ok_or_else(|| AppError::NotFound(format!("model {}", table)))?;
    Ok(Json(describe(state.registry.catalog(), &entry.model)))
}

pub async fn create(state: AppState, table: &str, body: Value) -> Result<(StatusCode, Json<Record>), AppError> {
    let storable = state.registry.storable(table)?;
    let record = storable.create(into_object(body)?).await?;
    Ok(response::created(record))
}

pub async fn list(state: AppState, table: &str) -> Result<Json<Vec<Record>>, AppError> {
    let storable = state.registry.storable(table)?;
    Ok(Json(storable.list().await?))
}

pub async fn read(state: AppState, table: &str, id: String) -> Result<Json<Record>, AppError> {
    let id = parse_id(&id)?;
    let storable = state.registry.storable(table)?;
    let record = storable.get(id).await?.ok_or_else(|| not_found(table, id))?;
    Ok(Json(record))
}

pub async fn update(state: AppState, table: &str, id: String, body: Value) -> Result<Json<Record>, AppError> {
    let id = parse_id(&id)?;
    let storable = state.registry.storable(table)?;
    let record = storable
        .update(id, into_object(body)?)
        .await?
        .ok_or_else(|| not_found(table, id))?;
    Ok(Json(record))
}

pub async fn delete(state: AppState, table: &str, id: String) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let storable = state.registry.storable(table)?;
    if !storable.delete(id).await? {
        return Err(not_found(table, id));
    }
    Ok(response::message("Deleted successfully").into_response())
}

/// Run an exposed action. `body` is `Some` only for body-carrying methods.
pub async fn action(state: AppState, table: &str, name: &str, body: Option<Value>) -> Result<Response, AppError> {
    let body = body.map(into_object).transpose()?;
    let output = action::invoke(state.registry.clone(), table, name, body).await?;
    Ok((output.status, Json(output.body)).into_response())
}
