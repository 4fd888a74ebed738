//! Exposed actions: async handlers bound to a model next to its CRUD routes.

use crate::config::ResolvedModel;
use crate::error::{AppError, ConfigError};
use crate::registry::Registry;
use crate::service::Storable;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What an action sees when invoked: the registry and the model it is declared on.
#[derive(Clone)]
pub struct ActionContext {
    pub registry: Arc<Registry>,
    pub model: Arc<ResolvedModel>,
}

impl ActionContext {
    /// Storable capability of the action's own model.
    pub fn storable(&self) -> Result<&Storable, AppError> {
        self.registry.storable(&self.model.table)
    }

    /// Storable capability of another registered model, by table name.
    pub fn storable_for(&self, table: &str) -> Result<&Storable, AppError> {
        self.registry.storable(table)
    }
}

/// Action result: a status plus a JSON body, so actions can answer e.g. 401 themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionOutput {
    pub status: StatusCode,
    pub body: Value,
}

impl ActionOutput {
    pub fn ok(body: Value) -> Self {
        ActionOutput {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn with_status(status: StatusCode, body: Value) -> Self {
        ActionOutput { status, body }
    }
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// `body` is present for body-carrying methods (POST, PUT) and always a JSON object.
    async fn call(
        &self,
        ctx: ActionContext,
        body: Option<Map<String, Value>>,
    ) -> Result<ActionOutput, AppError>;
}

#[async_trait]
impl<F, Fut> ActionHandler for F
where
    F: Fn(ActionContext, Option<Map<String, Value>>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActionOutput, AppError>> + Send + 'static,
{
    async fn call(
        &self,
        ctx: ActionContext,
        body: Option<Map<String, Value>>,
    ) -> Result<ActionOutput, AppError> {
        (self)(ctx, body).await
    }
}

/// Cloneable handle to a boxed handler, stored on declarations and resolved models.
#[derive(Clone)]
pub struct SharedActionHandler(pub Arc<dyn ActionHandler>);

impl fmt::Debug for SharedActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActionHandler")
    }
}

impl SharedActionHandler {
    pub async fn call(
        &self,
        ctx: ActionContext,
        body: Option<Map<String, Value>>,
    ) -> Result<ActionOutput, AppError> {
        self.0.call(ctx, body).await
    }
}

/// Look up an action on a registered model and run it.
pub async fn invoke(
    registry: Arc<Registry>,
    table: &str,
    action: &str,
    body: Option<Map<String, Value>>,
) -> Result<ActionOutput, AppError> {
    let entry = registry
        .entry(table)
        .ok_or_else(|| AppError::NotFound(table.to_string()))?;
    let model = entry.model.clone();
    let def = model
        .action(action)
        .ok_or_else(|| AppError::NotFound(format!("{}.{}", table, action)))?;
    if let Some(ref b) = body {
        crate::service::RequestValidator::validate_params(b, &def.params)?;
    }
    let handler = def.handler.clone().ok_or_else(|| {
        AppError::Config(ConfigError::MissingReference {
            kind: "action handler",
            id: format!("{}.{}", model.name, action),
        })
    })?;
    tracing::debug!(model = %model.name, action = %action, "invoking action");
    handler.call(ActionContext { registry, model }, body).await
}
