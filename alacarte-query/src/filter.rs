//! Filter types for building WHERE clauses.

use serde::{Deserialize, Serialize};

use crate::sql::DatabaseType;

/// A filter value that can be bound as a query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value.
    Json(serde_json::Value),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for FilterValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u64> for FilterValue {
    fn from(v: u64) -> Self {
        // Integers are signed 64-bit; larger values are bound as text.
        i64::try_from(v).map_or_else(|_| Self::String(v.to_string()), Self::Int)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A filter that can be converted to SQL.
///
/// Column names are used verbatim, so callers pass table-qualified names
/// (see [`crate::query::table_col`]) when the query may join other tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison.
    Equals(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),

    /// Is null check.
    IsNull(String),

    /// Arbitrary SQL expression; each `?` is one positional parameter.
    Raw(String, Vec<FilterValue>),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create a raw expression filter.
    pub fn raw(sql: impl Into<String>, params: Vec<FilterValue>) -> Self {
        Self::Raw(sql.into(), params)
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Generate SQL for this filter, appending bound values to `params`.
    ///
    /// Placeholders are numbered from the current length of `params`, so
    /// several filters can be rendered into one statement.
    pub fn write_sql(&self, db: DatabaseType, params: &mut Vec<FilterValue>) -> String {
        match self {
            Self::None => "TRUE".to_string(),

            Self::Equals(col, val) => {
                if val.is_null() {
                    format!("{} IS NULL", col)
                } else {
                    format!("{} = {}", col, bind(db, params, val.clone()))
                }
            }

            Self::In(col, values) => {
                if values.is_empty() {
                    return "FALSE".to_string();
                }
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| bind(db, params, v.clone()))
                    .collect();
                format!("{} IN ({})", col, placeholders.join(", "))
            }

            Self::IsNull(col) => format!("{} IS NULL", col),

            Self::Raw(sql, values) => {
                let mut values = values.iter();
                let mut out = String::with_capacity(sql.len());
                for c in sql.chars() {
                    if c == '?' {
                        if let Some(v) = values.next() {
                            out.push_str(&bind(db, params, v.clone()));
                            continue;
                        }
                    }
                    out.push(c);
                }
                out
            }

            Self::And(filters) => {
                if filters.is_empty() {
                    return "TRUE".to_string();
                }
                let parts: Vec<_> = filters.iter().map(|f| f.write_sql(db, params)).collect();
                format!("({})", parts.join(" AND "))
            }
        }
    }

    /// Generate SQL for this filter on its own.
    pub fn to_sql(&self, db: DatabaseType) -> (String, Vec<FilterValue>) {
        let mut params = Vec::new();
        let sql = self.write_sql(db, &mut params);
        (sql, params)
    }
}

fn bind(db: DatabaseType, params: &mut Vec<FilterValue>, value: FilterValue) -> String {
    params.push(value);
    db.placeholder(params.len())
}
