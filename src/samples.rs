//! Built-in sample models: User, Product, Comment.

use crate::config::{ActionConfig, FieldConfig, ModelConfig};
use crate::error::AppError;
use crate::service::{ActionContext, ActionOutput};
use axum::http::StatusCode;
use serde_json::{json, Map, Value};

pub fn user() -> ModelConfig {
    ModelConfig::new("User")
        .storable()
        .field(FieldConfig::new("name", "str"))
        .field(FieldConfig::new("email", "str"))
        .field(FieldConfig::new("age", "int").optional())
        .on_create(|fields| {
            if let Some(Value::String(email)) = fields.get_mut("email") {
                *email = email.to_lowercase();
            }
        })
        .action(
            ActionConfig::post("login", "/login")
                .param(FieldConfig::new("email", "str"))
                .param(FieldConfig::new("password", "str").optional())
                .returns("dict")
                .handler(login),
        )
}

pub fn product() -> ModelConfig {
    ModelConfig::new("Product")
        .storable()
        .field(FieldConfig::new("name", "str"))
        .field(FieldConfig::new("price", "float"))
        .field(FieldConfig::new("description", "str").with_default(json!("")))
        .action(
            ActionConfig::get("list", "/list")
                .returns("list[Product]")
                .handler(product_listing),
        )
}

pub fn comment() -> ModelConfig {
    ModelConfig::new("Comment")
        .storable()
        .field(FieldConfig::new("name", "str"))
        .field(FieldConfig::new("description", "str").with_default(json!("")))
        .field(FieldConfig::new("author", "User").optional())
}

pub fn all() -> Vec<ModelConfig> {
    vec![user(), product(), comment()]
}

/// Succeeds when a stored user has the given email (compared case-insensitively).
async fn login(ctx: ActionContext, body: Option<Map<String, Value>>) -> Result<ActionOutput, AppError> {
    let email = body
        .as_ref()
        .and_then(|b| b.get("email"))
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .ok_or_else(|| AppError::Validation("email is required".into()))?;

    let users = ctx.storable()?.list().await?;
    if users.iter().any(|u| u.get("email").and_then(Value::as_str) == Some(email.as_str())) {
        tracing::info!(email = %email, "login succeeded");
        Ok(ActionOutput::ok(json!({"message": "Login successful"})))
    } else {
        tracing::info!(email = %email, "login rejected");
        Ok(ActionOutput::with_status(
            StatusCode::UNAUTHORIZED,
            json!({"error": "Invalid credentials"}),
        ))
    }
}

async fn product_listing(_ctx: ActionContext, _body: Option<Map<String, Value>>) -> Result<ActionOutput, AppError> {
    Ok(ActionOutput::ok(json!([
        {"id": 1, "name": "Product A", "price": 10.0, "description": "Description A"},
        {"id": 2, "name": "Product B", "price": 20.0, "description": "Description B"}
    ])))
}
