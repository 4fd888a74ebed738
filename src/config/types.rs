//! Raw model declarations as written by the developer (JSON files or the fluent builder).

use crate::service::action::{ActionHandler, SharedActionHandler};
use crate::service::CreateHook;
use serde_json::{Map, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Unresolved type expression. Model names stay as plain names until the second
/// resolution pass, so forward and self references need no special casing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Str,
    Int,
    Float,
    Bool,
    Object,
    List(Box<TypeRef>),
    Named(String),
}

impl TypeRef {
    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }
}

impl FromStr for TypeRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty type expression".into());
        }
        let lower = s.to_ascii_lowercase();
        if let Some(inner) = lower
            .strip_prefix("list[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            // keep the original casing of a model name inside the brackets
            let start = s.len() - inner.len() - 1;
            let inner = &s[start..s.len() - 1];
            return Ok(TypeRef::list(inner.parse()?));
        }
        Ok(match lower.as_str() {
            "str" | "string" => TypeRef::Str,
            "int" | "integer" => TypeRef::Int,
            "float" | "number" => TypeRef::Float,
            "bool" | "boolean" => TypeRef::Bool,
            "dict" | "object" => TypeRef::Object,
            _ => TypeRef::Named(s.to_string()),
        })
    }
}

impl TryFrom<String> for TypeRef {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TypeRef> for String {
    fn from(t: TypeRef) -> Self {
        t.to_string()
    }
}

impl From<&str> for TypeRef {
    /// Builder convenience. An unparsable expression becomes an opaque named type,
    /// which the resolver later degrades to a string.
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| TypeRef::Named(s.to_string()))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Str => f.write_str("str"),
            TypeRef::Int => f.write_str("int"),
            TypeRef::Float => f.write_str("float"),
            TypeRef::Bool => f.write_str("bool"),
            TypeRef::Object => f.write_str("dict"),
            TypeRef::List(inner) => write!(f, "list[{}]", inner),
            TypeRef::Named(n) => f.write_str(n),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: TypeRef,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, type_: impl Into<TypeRef>) -> Self {
        FieldConfig {
            name: name.into(),
            type_: type_.into(),
            optional: false,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    /// Suffix appended to the model path, e.g. "/login". Empty means the model path itself.
    #[serde(default)]
    pub route: String,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    #[serde(default)]
    pub params: Vec<FieldConfig>,
    #[serde(default)]
    pub returns: Option<TypeRef>,
    /// Bound in Rust; JSON declarations must be bound via `ModelConfig::bind_action` before resolving.
    #[serde(skip)]
    pub handler: Option<SharedActionHandler>,
}

fn default_methods() -> Vec<String> {
    vec!["POST".into()]
}

impl ActionConfig {
    pub fn new(name: impl Into<String>, route: impl Into<String>) -> Self {
        ActionConfig {
            name: name.into(),
            route: route.into(),
            methods: default_methods(),
            params: Vec::new(),
            returns: None,
            handler: None,
        }
    }

    pub fn get(name: impl Into<String>, route: impl Into<String>) -> Self {
        Self::new(name, route).methods(["GET"])
    }

    pub fn post(name: impl Into<String>, route: impl Into<String>) -> Self {
        Self::new(name, route).methods(["POST"])
    }

    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn param(mut self, field: FieldConfig) -> Self {
        self.params.push(field);
        self
    }

    pub fn returns(mut self, type_: impl Into<TypeRef>) -> Self {
        self.returns = Some(type_.into());
        self
    }

    pub fn handler<H: ActionHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(SharedActionHandler(Arc::new(handler)));
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Path segment and storage table. Defaults to the lower-cased model name.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub storable: bool,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
    /// Runs on the validated field map before a storable model persists a new record.
    #[serde(skip)]
    pub on_create: Option<CreateHook>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        ModelConfig {
            name: name.into(),
            table: None,
            storable: false,
            fields: Vec::new(),
            actions: Vec::new(),
            on_create: None,
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn storable(mut self) -> Self {
        self.storable = true;
        self
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn action(mut self, action: ActionConfig) -> Self {
        self.actions.push(action);
        self
    }

    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Map<String, Value>) + Send + Sync + 'static,
    {
        self.on_create = Some(CreateHook(Arc::new(hook)));
        self
    }

    /// Attach a handler to an action declared without one (e.g. loaded from JSON).
    pub fn bind_action<H: ActionHandler + 'static>(&mut self, action: &str, handler: H) -> bool {
        match self.actions.iter_mut().find(|a| a.name == action) {
            Some(a) => {
                a.handler = Some(SharedActionHandler(Arc::new(handler)));
                true
            }
            None => false,
        }
    }

    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }
}
