//! Declaration validation: identifiers, uniqueness, action wiring.

use crate::config::{FieldConfig, Method, ModelConfig};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Name of the synthetic record identifier. Models may not declare it.
pub const ID_FIELD: &str = "id";

/// Top-level paths taken by the common routes; no model may use them as its table.
pub const RESERVED_TABLES: &[&str] = &["health", "version", "routes"];

static IDENT_RE: OnceLock<Regex> = OnceLock::new();
static ROUTE_RE: OnceLock<Regex> = OnceLock::new();

fn ident_re() -> &'static Regex {
    IDENT_RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

fn route_re() -> &'static Regex {
    ROUTE_RE.get_or_init(|| Regex::new(r"^(/[A-Za-z0-9_\-]+)*$").expect("valid regex"))
}

pub fn is_identifier(s: &str) -> bool {
    ident_re().is_match(s)
}

fn check_ident(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

fn check_fields(model: &str, kind: &'static str, fields: &[FieldConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for f in fields {
        check_ident(kind, &f.name)?;
        if f.name == ID_FIELD && kind == "field" {
            return Err(ConfigError::Validation(format!(
                "model {}: '{}' is reserved for the record identifier",
                model, ID_FIELD
            )));
        }
        if !seen.insert(f.name.as_str()) {
            return Err(ConfigError::DuplicateMember {
                kind,
                model: model.to_string(),
                name: f.name.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate(configs: &[ModelConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut tables = HashSet::new();

    for m in configs {
        check_ident("model", &m.name)?;
        let table = m.table_name();
        check_ident("table", &table)?;
        if RESERVED_TABLES.contains(&table.as_str()) {
            return Err(ConfigError::Validation(format!(
                "model {}: table '{}' is reserved",
                m.name, table
            )));
        }
        if !names.insert(m.name.as_str()) {
            return Err(ConfigError::DuplicateModel(m.name.clone()));
        }
        if !tables.insert(table.clone()) {
            return Err(ConfigError::DuplicateTable(table));
        }

        check_fields(&m.name, "field", &m.fields)?;

        let mut action_names = HashSet::new();
        for a in &m.actions {
            check_ident("action", &a.name)?;
            if !action_names.insert(a.name.as_str()) {
                return Err(ConfigError::DuplicateMember {
                    kind: "action",
                    model: m.name.clone(),
                    name: a.name.clone(),
                });
            }
            if !route_re().is_match(&a.route) {
                return Err(ConfigError::Validation(format!(
                    "action {}.{}: route '{}' must be empty or slash-separated segments",
                    m.name, a.name, a.route
                )));
            }
            if a.methods.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "action {}.{}: at least one method required",
                    m.name, a.name
                )));
            }
            for method in &a.methods {
                method
                    .parse::<Method>()
                    .map_err(|e| ConfigError::Validation(format!("action {}.{}: {}", m.name, a.name, e)))?;
            }
            check_fields(&m.name, "parameter", &a.params)?;
            if a.handler.is_none() {
                return Err(ConfigError::MissingReference {
                    kind: "action handler",
                    id: format!("{}.{}", m.name, a.name),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionConfig, FieldConfig};
    use crate::service::action::{ActionContext, ActionOutput};
    use crate::error::AppError;
    use serde_json::{Map, Value};

    async fn noop(_ctx: ActionContext, _body: Option<Map<String, Value>>) -> Result<ActionOutput, AppError> {
        Ok(ActionOutput::ok(Value::Null))
    }

    #[test]
    fn rejects_duplicate_model_names() {
        let configs = vec![ModelConfig::new("User"), ModelConfig::new("User").table("people")];
        assert!(matches!(validate(&configs), Err(ConfigError::DuplicateModel(n)) if n == "User"));
    }

    #[test]
    fn rejects_duplicate_tables() {
        let configs = vec![ModelConfig::new("User"), ModelConfig::new("Person").table("user")];
        assert!(matches!(validate(&configs), Err(ConfigError::DuplicateTable(t)) if t == "user"));
    }

    #[test]
    fn rejects_reserved_tables() {
        let configs = vec![ModelConfig::new("Health")];
        assert!(matches!(validate(&configs), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_reserved_id_field() {
        let configs = vec![ModelConfig::new("User").field(FieldConfig::new("id", "int"))];
        assert!(matches!(validate(&configs), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_bad_identifiers_and_routes() {
        let configs = vec![ModelConfig::new("User; DROP")];
        assert!(matches!(validate(&configs), Err(ConfigError::InvalidIdentifier { kind: "model", .. })));

        let configs = vec![ModelConfig::new("User").action(ActionConfig::post("login", "login").handler(noop))];
        assert!(matches!(validate(&configs), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_unknown_methods_and_unbound_actions() {
        let configs = vec![ModelConfig::new("User").action(
            ActionConfig::new("login", "/login").methods(["PATCH"]).handler(noop),
        )];
        assert!(matches!(validate(&configs), Err(ConfigError::Validation(_))));

        let configs = vec![ModelConfig::new("User").action(ActionConfig::post("login", "/login"))];
        assert!(matches!(
            validate(&configs),
            Err(ConfigError::MissingReference { kind: "action handler", .. })
        ));
    }

    #[test]
    fn accepts_well_formed_declarations() {
        let configs = vec![
            ModelConfig::new("User")
                .storable()
                .field(FieldConfig::new("name", "str"))
                .action(ActionConfig::post("login", "/login").handler(noop)),
            ModelConfig::new("Product").action(ActionConfig::get("all", "").handler(noop)),
        ];
        assert!(validate(&configs).is_ok());
    }
}
