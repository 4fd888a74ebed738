//! Route synthesis: the registry snapshot turned into a flat, sorted route table.

use crate::config::{Method, ResolvedModel, ID_FIELD};
use crate::error::ConfigError;
use crate::registry::Registry;
use crate::schema::{ref_schema, type_schema};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// What a route does once matched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteIntent {
    Schema,
    Create,
    List,
    Read,
    Update,
    Delete,
    Action { name: String },
}

impl RouteIntent {
    pub fn label(&self) -> &str {
        match self {
            RouteIntent::Schema => "schema",
            RouteIntent::Create => "create",
            RouteIntent::List => "list",
            RouteIntent::Read => "read",
            RouteIntent::Update => "update",
            RouteIntent::Delete => "delete",
            RouteIntent::Action { name } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteEntry {
    pub method: Method,
    /// Path template; the record id placeholder is `{id}`.
    pub path: String,
    pub model: String,
    pub table: String,
    pub intent: RouteIntent,
    /// Named inputs: the path id, the JSON body, or action parameters.
    pub parameters: Map<String, Value>,
    pub response: Value,
    pub success_status: u16,
}

impl RouteEntry {
    pub fn has_id(&self) -> bool {
        self.path.ends_with("/{id}")
    }

    pub fn takes_body(&self) -> bool {
        self.method.takes_body()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouteTable {
    pub routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn find(&self, method: Method, path: &str) -> Option<&RouteEntry> {
        self.routes.iter().find(|r| r.method == method && r.path == path)
    }
}

fn entry(
    model: &ResolvedModel,
    method: Method,
    path: String,
    intent: RouteIntent,
    parameters: Map<String, Value>,
    response: Value,
    success_status: u16,
) -> RouteEntry {
    RouteEntry {
        method,
        path,
        model: model.name.clone(),
        table: model.table.clone(),
        intent,
        parameters,
        response,
        success_status,
    }
}

fn id_param() -> Map<String, Value> {
    let mut m = Map::new();
    m.insert(ID_FIELD.to_string(), json!({"type": "integer", "in": "path"}));
    m
}

fn body_param(model: &ResolvedModel) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("body".into(), ref_schema(&model.name));
    m
}

fn model_routes(registry: &Registry, model: &ResolvedModel, storable: bool) -> Vec<RouteEntry> {
    let base = format!("/{}", model.table);
    let item = format!("{}/{{id}}", base);
    let schema_doc = json!({"type": "object", "title": "SchemaDocument"});
    let instance = ref_schema(&model.name);

    let mut out = vec![entry(
        model,
        Method::Get,
        format!("{}/schema", base),
        RouteIntent::Schema,
        Map::new(),
        schema_doc.clone(),
        200,
    )];

    if storable {
        out.push(entry(model, Method::Post, base.clone(), RouteIntent::Create, body_param(model), instance.clone(), 201));
        out.push(entry(
            model,
            Method::Get,
            base.clone(),
            RouteIntent::List,
            Map::new(),
            json!({"type": "array", "items": instance.clone()}),
            200,
        ));
        out.push(entry(model, Method::Get, item.clone(), RouteIntent::Read, id_param(), instance.clone(), 200));
        let mut update_params = id_param();
        update_params.extend(body_param(model));
        out.push(entry(model, Method::Put, item.clone(), RouteIntent::Update, update_params, instance, 200));
        out.push(entry(
            model,
            Method::Delete,
            item,
            RouteIntent::Delete,
            id_param(),
            json!({"type": "object", "properties": {"message": {"type": "string"}}}),
            200,
        ));
    } else {
        out.push(entry(model, Method::Get, base.clone(), RouteIntent::Schema, Map::new(), schema_doc, 200));
    }

    let catalog = registry.catalog();
    for action in &model.actions {
        let parameters: Map<String, Value> = action
            .params
            .iter()
            .map(|p| (p.name.clone(), type_schema(catalog, &p.ty)))
            .collect();
        let response = action
            .returns
            .as_ref()
            .map(|t| type_schema(catalog, t))
            .unwrap_or_else(|| json!({}));
        for method in &action.methods {
            out.push(entry(
                model,
                *method,
                format!("{}{}", base, action.route),
                RouteIntent::Action {
                    name: action.name.clone(),
                },
                parameters.clone(),
                response.clone(),
                200,
            ));
        }
    }
    out
}

/// Derive every route from the registry. Deterministic; a repeated (method, path) pair is a
/// configuration error.
pub fn synthesize(registry: &Registry) -> Result<RouteTable, ConfigError> {
    let mut routes = Vec::new();
    for e in registry.entries() {
        routes.extend(model_routes(registry, &e.model, e.storable.is_some()));
    }
    routes.sort_by(|a, b| (a.path.as_str(), a.method).cmp(&(b.path.as_str(), b.method)));

    let mut seen = HashSet::new();
    for r in &routes {
        if !seen.insert((r.method, r.path.as_str())) {
            return Err(ConfigError::DuplicateRoute {
                method: r.method.to_string(),
                path: r.path.clone(),
            });
        }
    }
    tracing::debug!(routes = routes.len(), "synthesized route table");
    Ok(RouteTable { routes })
}
