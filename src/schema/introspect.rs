//! Schema documents: a model's fields and exposed actions in JSON-Schema vocabulary, plus the
//! definitions of every model reachable from them.

use crate::config::{ActionDef, FieldDef, FieldType, Method, ModelCatalog, ResolvedModel};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaDocument {
    pub title: String,
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub fields: Map<String, Value>,
    pub required: Vec<String>,
    pub methods: BTreeMap<String, MethodSchema>,
    /// Flat: definitions never carry their own `$defs`.
    #[serde(rename = "$defs", skip_serializing_if = "BTreeMap::is_empty")]
    pub defs: BTreeMap<String, SchemaDocument>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MethodSchema {
    pub route: String,
    pub methods: Vec<Method>,
    pub parameters: Map<String, Value>,
    /// `{}` when the action declares no return type.
    pub returns: Value,
}

/// Reference into the document's `$defs`.
pub fn def_ref(model: &str) -> String {
    format!("#/$defs/{}", model)
}

pub fn ref_schema(model: &str) -> Value {
    json!({"$ref": def_ref(model)})
}

/// Schema for one field type. Unknown names fall back to a string schema.
pub fn type_schema(catalog: &ModelCatalog, ty: &FieldType) -> Value {
    match ty {
        FieldType::String => json!({"type": "string"}),
        FieldType::Integer => json!({"type": "integer"}),
        FieldType::Float => json!({"type": "number"}),
        FieldType::Boolean => json!({"type": "boolean"}),
        FieldType::Object => json!({"type": "object"}),
        FieldType::List(inner) => json!({"type": "array", "items": type_schema(catalog, inner)}),
        FieldType::Model(name) if catalog.model(name).is_some() => ref_schema(name),
        FieldType::Model(name) | FieldType::Opaque(name) => {
            tracing::warn!(type_name = %name, "no schema for type; falling back to string");
            json!({"type": "string"})
        }
    }
}

fn field_schema(catalog: &ModelCatalog, f: &FieldDef) -> Value {
    let mut schema = type_schema(catalog, &f.ty);
    if let (Some(default), Value::Object(obj)) = (&f.default, &mut schema) {
        obj.insert("default".into(), default.clone());
    }
    schema
}

fn method_schema(catalog: &ModelCatalog, a: &ActionDef) -> MethodSchema {
    MethodSchema {
        route: a.route.clone(),
        methods: a.methods.clone(),
        parameters: a
            .params
            .iter()
            .map(|p| (p.name.clone(), field_schema(catalog, p)))
            .collect(),
        returns: a
            .returns
            .as_ref()
            .map(|t| type_schema(catalog, t))
            .unwrap_or_else(|| json!({})),
    }
}

/// The model's own document, without `$defs`.
fn shallow(catalog: &ModelCatalog, model: &ResolvedModel) -> SchemaDocument {
    SchemaDocument {
        title: model.name.clone(),
        type_: "object",
        fields: model
            .fields
            .iter()
            .map(|f| (f.name.clone(), field_schema(catalog, f)))
            .collect(),
        required: model
            .fields
            .iter()
            .filter(|f| f.is_required())
            .map(|f| f.name.clone())
            .collect(),
        methods: model
            .actions
            .iter()
            .map(|a| (a.name.clone(), method_schema(catalog, a)))
            .collect(),
        defs: BTreeMap::new(),
    }
}

/// Model names referenced directly by fields, action parameters or action returns.
fn direct_refs(model: &ResolvedModel) -> impl Iterator<Item = &str> {
    let fields = model.fields.iter().map(|f| &f.ty);
    let params = model.actions.iter().flat_map(|a| a.params.iter().map(|p| &p.ty));
    let returns = model.actions.iter().filter_map(|a| a.returns.as_ref());
    fields.chain(params).chain(returns).filter_map(FieldType::model_ref)
}

/// Models transitively reachable from `model`. The model itself is included only when
/// some path leads back to it.
pub fn reachable_models(catalog: &ModelCatalog, model: &ResolvedModel) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<String> = direct_refs(model).map(str::to_string).collect();
    while let Some(name) = queue.pop_front() {
        let Some(next) = catalog.model(&name) else { continue };
        if !seen.insert(name) {
            continue;
        }
        queue.extend(direct_refs(next).map(str::to_string));
    }
    seen
}

/// Full schema document for `model`. Never fails.
pub fn describe(catalog: &ModelCatalog, model: &ResolvedModel) -> SchemaDocument {
    let mut doc = shallow(catalog, model);
    doc.defs = reachable_models(catalog, model)
        .into_iter()
        .filter_map(|name| {
            let m = catalog.model(&name)?;
            Some((name, shallow(catalog, m)))
        })
        .collect();
    doc
}
