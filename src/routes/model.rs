//! Model routes bound from the synthesized route table.
//! Every table entry becomes one method on one concrete path; entries sharing a path share a
//! `MethodRouter`.

use crate::config::Method;
use crate::handlers::model as handlers;
use crate::routes::{RouteEntry, RouteIntent};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{MethodFilter, MethodRouter},
    Json, Router,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

fn method_filter(method: Method) -> MethodFilter {
    match method {
        Method::Get => MethodFilter::GET,
        Method::Post => MethodFilter::POST,
        Method::Put => MethodFilter::PUT,
        Method::Delete => MethodFilter::DELETE,
    }
}

/// `/user/{id}` → `/user/:id`
fn axum_path(template: &str) -> String {
    template.replace("{id}", ":id")
}

fn bind(router: MethodRouter<AppState>, route: &RouteEntry) -> MethodRouter<AppState> {
    let filter = method_filter(route.method);
    let table: Arc<str> = Arc::from(route.table.as_str());
    match &route.intent {
        RouteIntent::Schema => router.on(filter, move |State(state): State<AppState>| async move {
            handlers::schema(state, &table).await
        }),
        RouteIntent::Create => router.on(
            filter,
            move |State(state): State<AppState>, Json(body): Json<Value>| async move {
                handlers::create(state, &table, body).await
            },
        ),
        RouteIntent::List => router.on(filter, move |State(state): State<AppState>| async move {
            handlers::list(state, &table).await
        }),
        RouteIntent::Read => router.on(
            filter,
            move |State(state): State<AppState>, Path(id): Path<String>| async move {
                handlers::read(state, &table, id).await
            },
        ),
        RouteIntent::Update => router.on(
            filter,
            move |State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<Value>| async move {
                handlers::update(state, &table, id, body).await
            },
        ),
        RouteIntent::Delete => router.on(
            filter,
            move |State(state): State<AppState>, Path(id): Path<String>| async move {
                handlers::delete(state, &table, id).await
            },
        ),
        RouteIntent::Action { name } => {
            let name: Arc<str> = Arc::from(name.as_str());
            if route.takes_body() {
                router.on(
                    filter,
                    move |State(state): State<AppState>, Json(body): Json<Value>| async move {
                        handlers::action(state, &table, &name, Some(body)).await
                    },
                )
            } else {
                router.on(filter, move |State(state): State<AppState>| async move {
                    handlers::action(state, &table, &name, None).await
                })
            }
        }
    }
}

/// One axum route per distinct path in the table.
pub fn model_routes(state: AppState) -> Router {
    let mut by_path: BTreeMap<String, MethodRouter<AppState>> = BTreeMap::new();
    for route in state.routes.iter() {
        let path = axum_path(&route.path);
        let router = by_path.remove(&path).unwrap_or_default();
        by_path.insert(path, bind(router, route));
    }
    let mut router = Router::new();
    for (path, method_router) in by_path {
        router = router.route(&path, method_router);
    }
    router.with_state(state)
}
