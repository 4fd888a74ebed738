//! Resolve declarations into a catalog, and load declarations from JSON files.
//!
//! Resolution is two-pass: every model name is collected first, then field, parameter
//! and return types are resolved against that set. Self references, forward references
//! and mutually-referencing models all resolve the same way.

use crate::config::resolved::{ActionDef, FieldDef, FieldType, Method, ModelCatalog, ResolvedModel};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Build the catalog from declarations (validates first).
pub fn resolve(configs: &[ModelConfig]) -> Result<ModelCatalog, ConfigError> {
    validate(configs)?;

    let declared: HashSet<&str> = configs.iter().map(|m| m.name.as_str()).collect();

    let mut models = Vec::with_capacity(configs.len());
    let mut model_by_name = HashMap::new();

    for m in configs {
        let fields = m
            .fields
            .iter()
            .map(|f| resolve_field(&m.name, f, &declared))
            .collect::<Vec<_>>();

        let mut actions = Vec::with_capacity(m.actions.len());
        for a in &m.actions {
            let mut methods = Vec::with_capacity(a.methods.len());
            for s in &a.methods {
                let method: Method = s
                    .parse()
                    .map_err(|e: String| ConfigError::Validation(format!("action {}.{}: {}", m.name, a.name, e)))?;
                if !methods.contains(&method) {
                    methods.push(method);
                }
            }
            actions.push(ActionDef {
                name: a.name.clone(),
                route: a.route.clone(),
                methods,
                params: a
                    .params
                    .iter()
                    .map(|p| resolve_field(&m.name, p, &declared))
                    .collect(),
                returns: a.returns.as_ref().map(|t| resolve_type(&m.name, t, &declared)),
                handler: a.handler.clone(),
            });
        }

        let model = Arc::new(ResolvedModel {
            name: m.name.clone(),
            table: m.table_name(),
            storable: m.storable,
            fields,
            actions,
            on_create: m.on_create.clone(),
        });
        model_by_name.insert(model.name.clone(), model.clone());
        models.push(model);
    }

    tracing::debug!(count = models.len(), "resolved model catalog");
    Ok(ModelCatalog {
        models,
        model_by_name,
    })
}

fn resolve_field(owner: &str, f: &FieldConfig, declared: &HashSet<&str>) -> FieldDef {
    FieldDef {
        name: f.name.clone(),
        ty: resolve_type(owner, &f.type_, declared),
        optional: f.optional,
        default: f.default.clone(),
    }
}

fn resolve_type(owner: &str, t: &TypeRef, declared: &HashSet<&str>) -> FieldType {
    match t {
        TypeRef::Str => FieldType::String,
        TypeRef::Int => FieldType::Integer,
        TypeRef::Float => FieldType::Float,
        TypeRef::Bool => FieldType::Boolean,
        TypeRef::Object => FieldType::Object,
        TypeRef::List(inner) => FieldType::List(Box::new(resolve_type(owner, inner, declared))),
        TypeRef::Named(name) if declared.contains(name.as_str()) => FieldType::Model(name.clone()),
        TypeRef::Named(name) => {
            tracing::warn!(model = %owner, type_name = %name, "unknown type; treating as opaque string");
            FieldType::Opaque(name.clone())
        }
    }
}

/// Read every `*.json` file in `dir`. Each file holds one model declaration or an array of them.
/// Files are read in name order so the resulting declaration order is stable.
pub async fn load_from_dir(dir: impl AsRef<Path>) -> Result<Vec<ModelConfig>, ConfigError> {
    let dir = dir.as_ref();
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", dir.display(), e)))?;

    let mut paths = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut configs = Vec::new();
    for path in paths {
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        let parsed = if value.is_array() {
            serde_json::from_value::<Vec<ModelConfig>>(value)
        } else {
            serde_json::from_value::<ModelConfig>(value).map(|m| vec![m])
        }
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), models = parsed.len(), "loaded model declarations");
        configs.extend(parsed);
    }
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_self_and_forward_references() {
        let configs = vec![
            ModelConfig::new("Node")
                .field(FieldConfig::new("parent", "Node").optional())
                .field(FieldConfig::new("children", "list[Node]"))
                .field(FieldConfig::new("owner", "Owner")),
            ModelConfig::new("Owner").field(FieldConfig::new("nodes", "List[Node]")),
        ];
        let catalog = resolve(&configs).unwrap();
        let node = catalog.model("Node").unwrap();
        assert_eq!(node.field("parent").unwrap().ty, FieldType::Model("Node".into()));
        assert_eq!(
            node.field("children").unwrap().ty,
            FieldType::List(Box::new(FieldType::Model("Node".into())))
        );
        assert_eq!(node.field("owner").unwrap().ty, FieldType::Model("Owner".into()));
        assert_eq!(catalog.model_by_table("owner").unwrap().name, "Owner");
    }

    #[test]
    fn unknown_names_become_opaque() {
        let configs = vec![ModelConfig::new("Event").field(FieldConfig::new("at", "datetime"))];
        let catalog = resolve(&configs).unwrap();
        assert_eq!(
            catalog.model("Event").unwrap().field("at").unwrap().ty,
            FieldType::Opaque("datetime".into())
        );
    }

    #[tokio::test]
    async fn loads_declarations_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a_user.json"),
            r#"{"name": "User", "storable": true, "fields": [{"name": "name", "type": "str"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b_more.json"),
            r#"[{"name": "Tag", "fields": [{"name": "label", "type": "str"}]},
                {"name": "Post", "fields": [{"name": "tags", "type": "list[Tag]"}]}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let configs = load_from_dir(dir.path()).await.unwrap();
        let names: Vec<_> = configs.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Tag", "Post"]);
        assert!(resolve(&configs).is_ok());
    }

    #[tokio::test]
    async fn malformed_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        assert!(matches!(load_from_dir(dir.path()).await, Err(ConfigError::Load(_))));
    }
}
