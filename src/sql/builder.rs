//! Builds parameterized CREATE, INSERT, SELECT, UPDATE, DELETE from a resolved model.

use crate::config::{FieldType, ResolvedModel, ID_FIELD};
use crate::error::AppError;
use crate::sql::SqliteBindValue;
use serde_json::{Map, Value};

/// Quote identifier for SQLite (safe: names are validated identifiers from declarations).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqliteBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }
}

/// Column affinity for a field type.
pub fn column_type(ty: &FieldType) -> &'static str {
    match ty {
        FieldType::Integer | FieldType::Boolean => "INTEGER",
        FieldType::Float => "REAL",
        FieldType::String => "TEXT",
        // JSON text
        FieldType::Object | FieldType::List(_) | FieldType::Model(_) | FieldType::Opaque(_) => "TEXT",
    }
}

/// id first, then declared fields in order.
fn column_list(model: &ResolvedModel) -> String {
    std::iter::once(quoted(ID_FIELD))
        .chain(model.fields.iter().map(|f| quoted(&f.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_table(model: &ResolvedModel) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quoted(ID_FIELD))];
    cols.extend(
        model
            .fields
            .iter()
            .map(|f| format!("{} {}", quoted(&f.name), column_type(&f.ty))),
    );
    q.sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quoted(&model.table),
        cols.join(", ")
    );
    q
}

/// INSERT the declared fields present in `fields`; RETURNING the full row.
pub fn insert(model: &ResolvedModel, fields: &Map<String, Value>) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    for f in &model.fields {
        let Some(v) = fields.get(&f.name) else { continue };
        cols.push(quoted(&f.name));
        q.params.push(SqliteBindValue::for_field(&f.name, &f.ty, v)?);
    }
    let table = quoted(&model.table);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, column_list(model))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            vec!["?"; cols.len()].join(", "),
            column_list(model)
        )
    };
    Ok(q)
}

/// SELECT every row ordered by id.
pub fn select_all(model: &ResolvedModel) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        column_list(model),
        quoted(&model.table),
        quoted(ID_FIELD)
    );
    q
}

pub fn select_by_id(model: &ResolvedModel, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        column_list(model),
        quoted(&model.table),
        quoted(ID_FIELD)
    );
    q.params.push(SqliteBindValue::I64(id));
    q
}

/// UPDATE by id: SET only declared fields present in `fields`. Caller guarantees at least one.
pub fn update(model: &ResolvedModel, id: i64, fields: &Map<String, Value>) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in &model.fields {
        let Some(v) = fields.get(&f.name) else { continue };
        sets.push(format!("{} = ?", quoted(&f.name)));
        q.params.push(SqliteBindValue::for_field(&f.name, &f.ty, v)?);
    }
    q.params.push(SqliteBindValue::I64(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ? RETURNING {}",
        quoted(&model.table),
        sets.join(", "),
        quoted(ID_FIELD),
        column_list(model)
    );
    Ok(q)
}

pub fn delete(model: &ResolvedModel, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {} WHERE {} = ?", quoted(&model.table), quoted(ID_FIELD));
    q.params.push(SqliteBindValue::I64(id));
    q
}
