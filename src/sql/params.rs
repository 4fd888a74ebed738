//! Convert serde_json::Value to types that sqlx can bind, guided by the declared field type.

use crate::config::FieldType;
use crate::error::AppError;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::sqlite::{Sqlite, SqliteTypeInfo};
use sqlx::{Database, Type};

/// A value that can be bound to a SQLite query.
#[derive(Clone, Debug, PartialEq)]
pub enum SqliteBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
}

impl SqliteBindValue {
    /// Lists, objects and nested models are stored as JSON text; scalars keep their SQLite type.
    /// An integer field only binds values that fit in `i64`.
    pub fn for_field(name: &str, ty: &FieldType, v: &Value) -> Result<Self, AppError> {
        Ok(match (ty, v) {
            (_, Value::Null) => SqliteBindValue::Null,
            (FieldType::List(_) | FieldType::Object | FieldType::Model(_), v) => {
                SqliteBindValue::Text(v.to_string())
            }
            (_, Value::Bool(b)) => SqliteBindValue::Bool(*b),
            (FieldType::Integer, Value::Number(n)) => match n.as_i64() {
                Some(i) => SqliteBindValue::I64(i),
                None => {
                    return Err(AppError::Validation(format!("{} is out of range for an integer", name)));
                }
            },
            (_, Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SqliteBindValue::I64(i),
                (None, Some(f)) => SqliteBindValue::F64(f),
                (None, None) => {
                    return Err(AppError::Validation(format!("{} is not a representable number", name)));
                }
            },
            (_, Value::String(s)) => SqliteBindValue::Text(s.clone()),
            (_, Value::Array(_) | Value::Object(_)) => SqliteBindValue::Text(v.to_string()),
        })
    }
}

impl<'q> Encode<'q, Sqlite> for SqliteBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            SqliteBindValue::Null => <Option<i64> as Encode<Sqlite>>::encode_by_ref(&None, buf)?,
            SqliteBindValue::Bool(b) => <bool as Encode<Sqlite>>::encode_by_ref(b, buf)?,
            SqliteBindValue::I64(n) => <i64 as Encode<Sqlite>>::encode_by_ref(n, buf)?,
            SqliteBindValue::F64(n) => <f64 as Encode<Sqlite>>::encode_by_ref(n, buf)?,
            SqliteBindValue::Text(s) => <String as Encode<Sqlite>>::encode_by_ref(s, buf)?,
        })
    }
}

impl Type<Sqlite> for SqliteBindValue {
    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }

    // Column affinity decides the stored type; accept any declared column.
    fn compatible(_ty: &SqliteTypeInfo) -> bool {
        true
    }
}
