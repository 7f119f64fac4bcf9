//! Conversion between alacarte values and SQLite values.

use alacarte_query::filter::FilterValue;
use alacarte_query::row::Value;
use rusqlite::types::{Value as SqliteValue, ValueRef};

/// Convert a bound parameter to a SQLite value.
///
/// Booleans are stored as integers and JSON as text.
pub fn to_sqlite(value: &FilterValue) -> SqliteValue {
    match value {
        FilterValue::Null => SqliteValue::Null,
        FilterValue::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        FilterValue::Int(i) => SqliteValue::Integer(*i),
        FilterValue::Float(f) => SqliteValue::Real(*f),
        FilterValue::String(s) => SqliteValue::Text(s.clone()),
        FilterValue::Json(j) => SqliteValue::Text(j.to_string()),
    }
}

/// Convert a result cell to a row [`Value`].
pub fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_sqlite() {
        assert_eq!(to_sqlite(&FilterValue::Null), SqliteValue::Null);
        assert_eq!(to_sqlite(&FilterValue::Bool(true)), SqliteValue::Integer(1));
        assert_eq!(to_sqlite(&FilterValue::Int(42)), SqliteValue::Integer(42));
        assert_eq!(
            to_sqlite(&FilterValue::String("Jeff".into())),
            SqliteValue::Text("Jeff".into())
        );
        assert_eq!(
            to_sqlite(&FilterValue::Json(serde_json::json!({"a": 1}))),
            SqliteValue::Text(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn test_from_sqlite() {
        assert_eq!(from_sqlite(ValueRef::Null), Value::Null);
        assert_eq!(from_sqlite(ValueRef::Integer(7)), Value::Int(7));
        assert_eq!(from_sqlite(ValueRef::Real(1.5)), Value::Float(1.5));
        assert_eq!(from_sqlite(ValueRef::Text(b"hi")), Value::Text("hi".into()));
        assert_eq!(from_sqlite(ValueRef::Blob(&[1, 2])), Value::Bytes(vec![1, 2]));
    }
}
