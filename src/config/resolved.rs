//! Resolved model catalog: declarations validated and cross-referenced for runtime use.

use crate::service::action::SharedActionHandler;
use crate::service::CreateHook;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Semantic field type after name resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Object,
    List(Box<FieldType>),
    /// Reference to a model declared in the same catalog.
    Model(String),
    /// Name that matched no declared model. Treated as a string everywhere.
    Opaque(String),
}

impl FieldType {
    /// Model names referenced by this type, including through lists.
    pub fn model_ref(&self) -> Option<&str> {
        match self {
            FieldType::Model(name) => Some(name),
            FieldType::List(inner) => inner.model_ref(),
            _ => None,
        }
    }
}

/// HTTP methods an action can be exposed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// POST and PUT carry a JSON-object body; GET and DELETE carry none.
    pub fn takes_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub optional: bool,
    pub default: Option<Value>,
}

impl FieldDef {
    /// Must be supplied on create: not optional and no declared default.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct ActionDef {
    pub name: String,
    pub route: String,
    pub methods: Vec<Method>,
    pub params: Vec<FieldDef>,
    pub returns: Option<FieldType>,
    pub handler: Option<SharedActionHandler>,
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub name: String,
    pub table: String,
    pub storable: bool,
    pub fields: Vec<FieldDef>,
    pub actions: Vec<ActionDef>,
    pub on_create: Option<CreateHook>,
}

impl ResolvedModel {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Project an arbitrary map onto the declared fields: every declared field present
    /// (null when absent), undeclared keys dropped.
    pub fn project(&self, mut values: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for f in &self.fields {
            let v = values.remove(&f.name).unwrap_or(Value::Null);
            out.insert(f.name.clone(), v);
        }
        out
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelCatalog {
    pub models: Vec<Arc<ResolvedModel>>,
    pub model_by_name: HashMap<String, Arc<ResolvedModel>>,
}

impl ModelCatalog {
    pub fn model(&self, name: &str) -> Option<&Arc<ResolvedModel>> {
        self.model_by_name.get(name)
    }

    pub fn model_by_table(&self, table: &str) -> Option<&Arc<ResolvedModel>> {
        self.models.iter().find(|m| m.table == table)
    }
}
