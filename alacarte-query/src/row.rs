//! Row values and typed scan destinations.
//!
//! Engines hand rows to the resolver as ordered [`Value`] cells. Field
//! descriptors consume those cells left to right through a [`RowCursor`],
//! converting each one with [`FromValue`]:
//!
//! ```rust
//! use alacarte_query::row::{Row, Value};
//!
//! let row = Row::new(vec![Value::Int(1), Value::Text("Jeff".into())]);
//! let mut cursor = row.cursor();
//! let id: u64 = cursor.scan().unwrap();
//! let name: String = cursor.scan().unwrap();
//! assert_eq!((id, name.as_str()), (1, "Jeff"));
//! assert!(cursor.finish().is_ok());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Error type for row scanning.
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    /// The row has fewer columns than the selected fields scan.
    ColumnNotFound(usize),
    /// The row has more columns than the selected fields scan.
    UnscannedColumns {
        /// Number of columns the fields consumed.
        scanned: usize,
        /// Number of columns in the row.
        width: usize,
    },
    /// Type conversion error.
    TypeConversion {
        /// Zero-based column index.
        column: usize,
        /// What went wrong.
        message: String,
    },
    /// Null value for a non-optional destination.
    UnexpectedNull(usize),
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnNotFound(col) => write!(f, "column {} not found", col),
            Self::UnscannedColumns { scanned, width } => {
                write!(f, "scanned {} of {} columns", scanned, width)
            }
            Self::TypeConversion { column, message } => {
                write!(f, "type conversion error for column {}: {}", column, message)
            }
            Self::UnexpectedNull(col) => write!(f, "unexpected null in column {}", col),
        }
    }
}

impl std::error::Error for RowError {}

impl From<RowError> for QueryError {
    fn from(err: RowError) -> Self {
        QueryError::deserialization(err.to_string()).with_source(err)
    }
}

/// One cell of a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// A destination type a [`Value`] can be scanned into.
pub trait FromValue: Sized {
    /// Convert the cell at `column`.
    fn from_value(value: Value, column: usize) -> Result<Self, RowError>;
}

fn mismatch(value: &Value, column: usize, expected: &str) -> RowError {
    if matches!(value, Value::Null) {
        return RowError::UnexpectedNull(column);
    }
    RowError::TypeConversion {
        column,
        message: format!("expected {}, found {}", expected, value.kind()),
    }
}

impl FromValue for i64 {
    fn from_value(value: Value, column: usize) -> Result<Self, RowError> {
        match value {
            Value::Int(i) => Ok(i),
            Value::Bool(b) => Ok(i64::from(b)),
            other => Err(mismatch(&other, column, "integer")),
        }
    }
}

macro_rules! from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value, column: usize) -> Result<Self, RowError> {
                    let i = i64::from_value(value, column)?;
                    <$ty>::try_from(i).map_err(|e| RowError::TypeConversion {
                        column,
                        message: e.to_string(),
                    })
                }
            }
        )*
    };
}

from_value_int!(i32, u32, u64);

impl FromValue for bool {
    fn from_value(value: Value, column: usize) -> Result<Self, RowError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            other => Err(mismatch(&other, column, "bool")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value, column: usize) -> Result<Self, RowError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch(&other, column, "float")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value, column: usize) -> Result<Self, RowError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b).map_err(|e| RowError::TypeConversion {
                column,
                message: e.to_string(),
            }),
            other => Err(mismatch(&other, column, "text")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value, column: usize) -> Result<Self, RowError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch(&other, column, "bytes")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, column: usize) -> Result<Self, RowError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, column).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value, _column: usize) -> Result<Self, RowError> {
        Ok(value)
    }
}

/// An owned result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Create a row from its cells.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the cells.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row into a scanning cursor.
    pub fn cursor(self) -> RowCursor {
        RowCursor {
            width: self.values.len(),
            values: self.values.into_iter(),
            position: 0,
        }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Sequential reader over the cells of one row.
#[derive(Debug)]
pub struct RowCursor {
    values: std::vec::IntoIter<Value>,
    position: usize,
    width: usize,
}

impl RowCursor {
    /// Scan the next cell into `V`.
    pub fn scan<V: FromValue>(&mut self) -> Result<V, RowError> {
        let column = self.position;
        let value = self
            .values
            .next()
            .ok_or(RowError::ColumnNotFound(column))?;
        self.position += 1;
        V::from_value(value, column)
    }

    /// Index of the next cell.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Verify every cell was consumed.
    pub fn finish(self) -> Result<(), RowError> {
        if self.position != self.width {
            return Err(RowError::UnscannedColumns {
                scanned: self.position,
                width: self.width,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_in_order() {
        let mut cursor = Row::new(vec![Value::Int(3), Value::Text("x".into())]).cursor();
        assert_eq!(cursor.scan::<i64>().unwrap(), 3);
        assert_eq!(cursor.scan::<String>().unwrap(), "x");
        assert_eq!(cursor.position(), 2);
        assert!(cursor.finish().is_ok());
    }

    #[test]
    fn test_scan_past_end() {
        let mut cursor = Row::new(vec![Value::Int(3)]).cursor();
        cursor.scan::<i64>().unwrap();
        assert_eq!(cursor.scan::<i64>(), Err(RowError::ColumnNotFound(1)));
    }

    #[test]
    fn test_finish_with_leftover_columns() {
        let mut cursor = Row::new(vec![Value::Int(3), Value::Int(4)]).cursor();
        cursor.scan::<i64>().unwrap();
        assert_eq!(
            cursor.finish(),
            Err(RowError::UnscannedColumns { scanned: 1, width: 2 })
        );
    }

    #[test]
    fn test_null_handling() {
        assert_eq!(Option::<i64>::from_value(Value::Null, 0).unwrap(), None);
        assert_eq!(String::from_value(Value::Null, 2), Err(RowError::UnexpectedNull(2)));
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(u64::from_value(Value::Int(7), 0).unwrap(), 7);
        assert!(u64::from_value(Value::Int(-1), 0).is_err());
        assert!(bool::from_value(Value::Int(1), 0).unwrap());
        assert_eq!(f64::from_value(Value::Int(2), 0).unwrap(), 2.0);
    }

    #[test]
    fn test_type_mismatch_names_column() {
        let err = i64::from_value(Value::Text("abc".into()), 4).unwrap_err();
        assert!(err.to_string().contains("column 4"));
        let query_err: QueryError = err.into();
        assert_eq!(query_err.code, crate::error::ErrorCode::DeserializationError);
    }
}
