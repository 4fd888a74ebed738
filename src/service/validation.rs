//! Request validation from declared field types.

use crate::config::{FieldDef, FieldType};
use crate::error::AppError;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full instance. Every required field must be present and non-null;
    /// every present field must match its declared type.
    pub fn validate(body: &Map<String, Value>, fields: &[FieldDef]) -> Result<(), AppError> {
        for f in fields {
            match body.get(&f.name) {
                None | Some(Value::Null) if f.is_required() => {
                    return Err(AppError::Validation(format!("{} is required", f.name)));
                }
                Some(v) => validate_field(f, v)?,
                None => {}
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for update). Undeclared keys are ignored here.
    pub fn validate_partial(body: &Map<String, Value>, fields: &[FieldDef]) -> Result<(), AppError> {
        for (name, v) in body {
            if let Some(f) = fields.iter().find(|f| &f.name == name) {
                validate_field(f, v)?;
            }
        }
        Ok(())
    }

    /// Action parameters follow the same rules as a full instance.
    pub fn validate_params(body: &Map<String, Value>, params: &[FieldDef]) -> Result<(), AppError> {
        Self::validate(body, params)
    }

    /// Store integral numbers given for float fields as floats, so every engine returns `10.0`.
    pub fn coerce_floats(body: &mut Map<String, Value>, fields: &[FieldDef]) {
        for f in fields {
            if let Some(v) = body.get_mut(&f.name) {
                coerce_float(&f.ty, v);
            }
        }
    }
}

fn coerce_float(ty: &FieldType, v: &mut Value) {
    match (ty, v) {
        (FieldType::Float, Value::Number(n)) if !n.is_f64() => {
            if let Some(f) = n.as_f64().and_then(serde_json::Number::from_f64) {
                *n = f;
            }
        }
        (FieldType::List(inner), Value::Array(items)) => {
            for item in items {
                coerce_float(inner, item);
            }
        }
        _ => {}
    }
}

fn validate_field(f: &FieldDef, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        if f.optional {
            return Ok(());
        }
        return Err(AppError::Validation(format!("{} must not be null", f.name)));
    }
    if !matches_type(&f.ty, v) {
        return Err(AppError::Validation(format!(
            "{} must be {}",
            f.name,
            describe(&f.ty)
        )));
    }
    Ok(())
}

pub(crate) fn matches_type(ty: &FieldType, v: &Value) -> bool {
    match ty {
        FieldType::String | FieldType::Opaque(_) => v.is_string(),
        FieldType::Integer => v.is_i64(),
        FieldType::Float => v.is_number(),
        FieldType::Boolean => v.is_boolean(),
        FieldType::Object | FieldType::Model(_) => v.is_object(),
        FieldType::List(inner) => v
            .as_array()
            .map(|items| items.iter().all(|item| matches_type(inner, item)))
            .unwrap_or(false),
    }
}

fn describe(ty: &FieldType) -> String {
    match ty {
        FieldType::String | FieldType::Opaque(_) => "a string".into(),
        FieldType::Integer => "an integer".into(),
        FieldType::Float => "a number".into(),
        FieldType::Boolean => "a boolean".into(),
        FieldType::Object => "an object".into(),
        FieldType::Model(name) => format!("a {} object", name),
        FieldType::List(inner) => format!("a list of {}", describe(inner)),
    }
}
