//! Field descriptors: a projection plus a typed scan onto the record.
//!
//! ```rust
//! use alacarte_query::field::{FieldType, defer, ptr, row_scan};
//! use alacarte_query::query::col;
//!
//! #[derive(Default)]
//! struct Author {
//!     id: i64,
//!     tags: Vec<String>,
//! }
//!
//! let id = FieldType::new(col(["id"]), ptr(|a: &mut Author| &mut a.id));
//!
//! // Scan into a temporary and transform it once the whole row is read.
//! let tags = FieldType::new(
//!     col(["tags"]),
//!     row_scan(|_: &mut Author, row| {
//!         let raw: String = row.scan()?;
//!         Ok(defer(move |a: &mut Author| {
//!             a.tags = raw.split(',').map(str::to_string).collect();
//!         }))
//!     }),
//! );
//! # let _ = (id, tags);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::query::{QueryMod, col};
use crate::row::{FromValue, Row, RowCursor, RowError};

/// A transform applied to the record after the whole row has been scanned.
pub type Action<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Consumes this field's cells from the cursor and writes them onto the record.
pub type RowScan<T> =
    Arc<dyn Fn(&mut T, &mut RowCursor) -> Result<Option<Action<T>>, RowError> + Send + Sync>;

/// Wrap a closure as a [`RowScan`].
pub fn row_scan<T, F>(f: F) -> RowScan<T>
where
    F: Fn(&mut T, &mut RowCursor) -> Result<Option<Action<T>>, RowError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Scan a single cell straight into the attribute `f` points at.
pub fn ptr<T, V, F>(f: F) -> RowScan<T>
where
    T: 'static,
    V: FromValue,
    F: Fn(&mut T) -> &mut V + Send + Sync + 'static,
{
    Arc::new(move |record: &mut T, row: &mut RowCursor| {
        *f(record) = row.scan()?;
        Ok(None)
    })
}

/// Box a deferred action.
pub fn defer<T, F>(f: F) -> Option<Action<T>>
where
    F: FnOnce(&mut T) + Send + 'static,
{
    Some(Box::new(f))
}

/// Concatenate scans: cells are consumed in order and the deferred actions
/// are chained in the same order.
pub fn concat<T: 'static>(scans: Vec<RowScan<T>>) -> RowScan<T> {
    Arc::new(move |record: &mut T, row: &mut RowCursor| {
        let mut actions: Vec<Action<T>> = Vec::new();
        for scan in &scans {
            if let Some(action) = scan(record, row)? {
                actions.push(action);
            }
        }
        if actions.is_empty() {
            return Ok(None);
        }
        Ok(defer(move |record: &mut T| {
            for action in actions {
                action(record);
            }
        }))
    })
}

/// Scan one row into a fresh record, then run the deferred action.
///
/// Every cell must be consumed; a short or wide row is an error.
pub fn scan_row<T: Default>(row: Row, scan: &RowScan<T>) -> Result<T, RowError> {
    let mut record = T::default();
    let mut cursor = row.cursor();
    let action = scan(&mut record, &mut cursor)?;
    cursor.finish()?;
    if let Some(action) = action {
        action(&mut record);
    }
    Ok(record)
}

/// Maps one exposed attribute to the columns it needs and how to scan them.
pub struct FieldType<T> {
    /// Projects this field's column(s).
    pub modifier: QueryMod,
    /// Reads the projected cells onto the record.
    pub row_scan: RowScan<T>,
}

impl<T> FieldType<T> {
    /// Create a field from a projection and a scan.
    pub fn new(modifier: QueryMod, row_scan: RowScan<T>) -> Self {
        Self { modifier, row_scan }
    }

    /// A field whose single column shares its name.
    pub fn simple<V, F>(name: &str, f: F) -> Self
    where
        T: 'static,
        V: FromValue,
        F: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        Self::new(col([name]), ptr(f))
    }
}

impl<T> Clone for FieldType<T> {
    fn clone(&self) -> Self {
        Self {
            modifier: self.modifier.clone(),
            row_scan: Arc::clone(&self.row_scan),
        }
    }
}

impl<T> fmt::Debug for FieldType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldType").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Value;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, PartialEq)]
    struct Author {
        id: i64,
        name: String,
        tags: Vec<String>,
    }

    fn tags_scan() -> RowScan<Author> {
        row_scan(|_: &mut Author, row| {
            let raw: String = row.scan()?;
            Ok(defer(move |a: &mut Author| {
                a.tags = raw.split(',').map(str::to_string).collect();
            }))
        })
    }

    #[test]
    fn test_ptr_assigns() {
        let scan = ptr(|a: &mut Author| &mut a.id);
        let author = scan_row(Row::new(vec![Value::Int(9)]), &scan).unwrap();
        assert_eq!(author.id, 9);
    }

    #[test]
    fn test_concat_preserves_order_and_runs_actions() {
        let scan = concat(vec![
            ptr(|a: &mut Author| &mut a.id),
            tags_scan(),
            ptr(|a: &mut Author| &mut a.name),
        ]);
        let row = Row::new(vec![
            Value::Int(1),
            Value::Text("a,b".into()),
            Value::Text("Jeff".into()),
        ]);
        let author = scan_row(row, &scan).unwrap();
        assert_eq!(
            author,
            Author {
                id: 1,
                name: "Jeff".into(),
                tags: vec!["a".into(), "b".into()],
            }
        );
    }

    #[test]
    fn test_actions_run_after_full_scan() {
        // The action observes the name scanned after it was created.
        let scan = concat(vec![
            row_scan(|_: &mut Author, _| {
                Ok(defer(|a: &mut Author| a.tags = vec![a.name.clone()]))
            }),
            ptr(|a: &mut Author| &mut a.name),
        ]);
        let author = scan_row(Row::new(vec![Value::Text("late".into())]), &scan).unwrap();
        assert_eq!(author.tags, vec!["late".to_string()]);
    }

    #[test]
    fn test_scan_row_rejects_wide_rows() {
        let scan = ptr(|a: &mut Author| &mut a.id);
        let err = scan_row(Row::new(vec![Value::Int(1), Value::Int(2)]), &scan).unwrap_err();
        assert_eq!(err, RowError::UnscannedColumns { scanned: 1, width: 2 });
    }

    #[test]
    fn test_simple_projects_field_name() {
        let field = FieldType::simple("name", |a: &mut Author| &mut a.name);
        let q = field
            .modifier
            .apply(crate::query::SelectQuery::new("authors"), "authors");
        assert_eq!(q.projected(), ["authors.name"]);
    }
}
