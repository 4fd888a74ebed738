use axum::http::StatusCode;
use blueprint_sdk::{
    build_router, build_router_with, resolve, samples, ConfigError, FieldConfig, JsonFileStorage, ModelConfig,
    Registry, SqliteStorage, StorageHandle,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn app_with(configs: Vec<ModelConfig>, storage: StorageHandle) -> axum::Router {
    let mut registry = Registry::new(resolve(&configs).unwrap());
    registry.register_all(Some(storage)).await.unwrap();
    build_router(Arc::new(registry)).unwrap()
}

/// Sample models over a private in-memory SQLite database.
async fn sample_app() -> axum::Router {
    let storage: StorageHandle = Arc::new(SqliteStorage::in_memory().await.unwrap());
    app_with(samples::all(), storage).await
}

/// Send a request via `oneshot` and return (status, parsed JSON body).
async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

async fn put_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", uri, Some(body)).await
}

async fn delete(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, None).await
}

// ---------------------------------------------------------------------------
// User: create + login action
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_user_then_login() {
    let app = sample_app().await;

    let (status, body) = post_json(&app, "/user", json!({"name": "Eve", "email": "eve@example.com"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "eve@example.com");
    assert_eq!(body["name"], "Eve");
    assert!(body["age"].is_null());
    assert!(body["id"].as_i64().unwrap() > 0);

    let (status, body) = post_json(&app, "/user/login", json!({"email": "eve@example.com"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Login successful"}));

    let (status, body) = post_json(&app, "/user/login", json!({"email": "nobody@example.com"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid credentials"}));
}

#[tokio::test]
async fn user_email_is_lower_cased_on_create() {
    let app = sample_app().await;
    let (status, body) = post_json(&app, "/user", json!({"name": "Al", "email": "Al@Example.COM"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "al@example.com");

    let (status, _) = post_json(&app, "/user/login", json!({"email": "AL@example.com"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_validates_its_parameters() {
    let app = sample_app().await;
    let (status, body) = post_json(&app, "/user/login", json!({"email": 42})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[tokio::test]
async fn crud_round_trip_over_http() {
    let app = sample_app().await;

    let (status, created) = post_json(&app, "/product", json!({"name": "Pen", "price": 1.5})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["description"], "");
    let id = created["id"].as_i64().unwrap();

    let (status, list) = get(&app, "/product").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, fetched) = get(&app, &format!("/product/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = put_json(&app, &format!("/product/{}", id), json!({"price": 2.0})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 2.0);
    assert_eq!(updated["name"], "Pen");

    let (status, body) = delete(&app, &format!("/product/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted successfully");

    let (status, body) = get(&app, &format!("/product/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = delete(&app, &format!("/product/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let app = sample_app().await;

    let (status, body) = post_json(&app, "/product", json!({"name": "Pen"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = post_json(&app, "/product", json!(["not", "an", "object"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, created) = post_json(&app, "/product", json!({"name": "Pen", "price": 1.0})).await;
    let id = created["id"].as_i64().unwrap();
    let (status, _) = put_json(&app, &format!("/product/{}", id), json!({"unknown": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = put_json(&app, &format!("/product/{}", id), json!({"price": "free"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/product/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn integers_beyond_i64_are_rejected_on_both_engines() {
    let dir = tempfile::tempdir().unwrap();
    let engines: Vec<StorageHandle> = vec![
        Arc::new(SqliteStorage::in_memory().await.unwrap()),
        Arc::new(JsonFileStorage::open(dir.path()).await.unwrap()),
    ];
    for storage in engines {
        let app = app_with(samples::all(), storage).await;
        let body = serde_json::from_str::<Value>(r#"{"name": "Big", "email": "big@x", "age": 18446744073709551615}"#).unwrap();
        let (status, err) = post_json(&app, "/user", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["code"], "validation_error");

        let (status, list) = get(&app, "/user").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let storage: StorageHandle = Arc::new(SqliteStorage::in_memory().await.unwrap());
    let mut registry = Registry::new(resolve(&samples::all()).unwrap());
    registry.register_all(Some(storage)).await.unwrap();
    let app = build_router_with(Arc::new(registry), 64, None).unwrap();

    let (status, _) = post_json(&app, "/user", json!({"name": "x".repeat(200), "email": "e@x"})).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = post_json(&app, "/user", json!({"name": "Eve", "email": "e@x"})).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let app = sample_app().await;
    let (status, _) = put_json(&app, "/product/999", json!({"price": 3.0})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn nested_model_fields_round_trip() {
    let app = sample_app().await;
    let author = json!({"name": "Eve", "email": "eve@example.com"});
    let (status, created) = post_json(&app, "/comment", json!({"name": "hi", "author": author})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, fetched) = get(&app, &format!("/comment/{}", created["id"])).await;
    assert_eq!(fetched["author"], author);
    assert_eq!(fetched["description"], "");
}

// ---------------------------------------------------------------------------
// Schema, actions, common routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn product_schema_describes_fields() {
    let app = sample_app().await;
    let (status, doc) = get(&app, "/product/schema").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["title"], "Product");
    assert_eq!(doc["fields"]["name"], json!({"type": "string"}));
    assert_eq!(doc["fields"]["price"], json!({"type": "number"}));
    assert_eq!(doc["methods"]["list"]["methods"], json!(["GET"]));
}

#[tokio::test]
async fn comment_schema_includes_referenced_user() {
    let app = sample_app().await;
    let (_, doc) = get(&app, "/comment/schema").await;
    assert_eq!(doc["fields"]["author"], json!({"$ref": "#/$defs/User"}));
    assert_eq!(doc["$defs"]["User"]["title"], "User");
}

#[tokio::test]
async fn static_action_route_coexists_with_id_route() {
    let app = sample_app().await;
    let (status, body) = get(&app, "/product/list").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["name"], "Product A");
}

#[tokio::test]
async fn non_storable_model_serves_schema_at_its_root() {
    let storage: StorageHandle = Arc::new(SqliteStorage::in_memory().await.unwrap());
    let app = app_with(
        vec![ModelConfig::new("Greeting").field(FieldConfig::new("text", "str"))],
        storage,
    )
    .await;
    let (status, root) = get(&app, "/greeting").await;
    assert_eq!(status, StatusCode::OK);
    let (_, schema) = get(&app, "/greeting/schema").await;
    assert_eq!(root, schema);
    let (status, _) = post_json(&app, "/greeting", json!({"text": "hi"})).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn common_routes_report_health_routes_and_openapi() {
    let app = sample_app().await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["models"], 3);

    let (_, body) = get(&app, "/version").await;
    assert_eq!(body["name"], "blueprint-sdk");

    let (_, table) = get(&app, "/routes").await;
    let routes = table["routes"].as_array().unwrap();
    assert!(routes
        .iter()
        .any(|r| r["method"] == "POST" && r["path"] == "/user/login" && r["intent"]["kind"] == "action"));

    let (status, doc) = get(&app, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/user/{id}"]["put"].is_object());
    assert!(doc["components"]["schemas"]["Product"].is_object());

    let (status, body) = get(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

// ---------------------------------------------------------------------------
// Storage selection and bootstrap errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_file_storage_backs_the_same_api() {
    let dir = tempfile::tempdir().unwrap();
    let storage: StorageHandle = Arc::new(JsonFileStorage::open(dir.path()).await.unwrap());
    let app = app_with(samples::all(), storage).await;

    let (status, created) = post_json(&app, "/user", json!({"name": "Eve", "email": "eve@example.com", "age": 30})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join("user.json")).unwrap()).unwrap();
    assert_eq!(on_disk[0]["email"], "eve@example.com");

    let (status, _) = post_json(&app, "/user/login", json!({"email": "eve@example.com"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn colliding_routes_fail_router_construction() {
    use blueprint_sdk::{ActionConfig, ActionContext, ActionOutput, AppError};
    use serde_json::Map;

    async fn everyone(_ctx: ActionContext, _body: Option<Map<String, Value>>) -> Result<ActionOutput, AppError> {
        Ok(ActionOutput::ok(json!([])))
    }

    let configs = vec![ModelConfig::new("User")
        .storable()
        .field(FieldConfig::new("name", "str"))
        .action(ActionConfig::get("everyone", "").handler(everyone))];
    let storage: StorageHandle = Arc::new(SqliteStorage::in_memory().await.unwrap());
    let mut registry = Registry::new(resolve(&configs).unwrap());
    registry.register_all(Some(storage)).await.unwrap();
    assert!(matches!(
        build_router(Arc::new(registry)),
        Err(ConfigError::DuplicateRoute { .. })
    ));
}
