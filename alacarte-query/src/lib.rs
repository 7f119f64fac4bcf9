//! # alacarte-query
//!
//! Schema-driven selective loading of relational records.
//!
//! A [`ModelSchema`] describes how one record type is read from one table:
//! named fields (a query modifier plus a row scanner) and named relations to
//! other schemas. A caller asks for dotted paths such as `"name"`,
//! `"books.title"` or `"books.comments.*"`, and the resulting [`ModelQuery`]
//! issues exactly one SELECT for the base records and one per selected
//! relation per nesting level, however many parents there are.
//!
//! ## Defining schemas
//!
//! ```rust
//! use alacarte_query::prelude::*;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Author {
//!     id: i64,
//!     name: String,
//! }
//!
//! let authors = ModelSchema::<Author>::new("authors")
//!     .add_simple_field("id", |a: &mut Author| &mut a.id)
//!     .add_simple_field("name", |a: &mut Author| &mut a.name);
//!
//! assert!(authors.check("name").is_ok());
//! assert!(authors.check("email").is_err());
//!
//! let plan = authors.query(["name"]);
//! let (sql, _) = plan.base_query()?.to_sql(DatabaseType::SQLite)?;
//! assert_eq!(sql, "SELECT authors.name FROM authors");
//! # Ok::<(), QueryError>(())
//! ```
//!
//! ## Selection paths
//!
//! - `""` selects nothing
//! - `"*"` selects every field
//! - `"books"` selects the relation with every child field
//! - `"books.title"` selects the relation with the listed child paths
//!
//! Invalid paths are accumulated on the plan and reported together by
//! [`ModelQuery::err`]; nothing is executed while the plan has errors.
//!
//! ## Executing
//!
//! Plans run against any [`QueryEngine`]; `alacarte-sqlite` provides one for
//! SQLite. Execution honors an optional [`CancellationToken`].
//!
//! ```rust,ignore
//! let authors = AUTHORS
//!     .query(["name", "books.title"])
//!     .with_cancellation(token)
//!     .collect(&engine)
//!     .await?;
//! ```

pub mod context;
pub mod error;
pub mod field;
pub mod filter;
pub mod logging;
pub mod plan;
pub mod query;
pub mod relations;
pub mod row;
pub mod schema;
pub mod sql;
pub mod traits;

#[cfg(test)]
mod testing;

pub use context::ExecContext;
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use field::{Action, FieldType, RowScan, concat, defer, ptr, row_scan, scan_row};
pub use filter::{Filter, FilterValue};
pub use plan::ModelQuery;
pub use query::{QueryMod, SelectQuery, col, table_col};
pub use relations::{
    Binder, BoundRelation, FilterBuilder, Relation, RelationKind, Resolve, bind_by, bind_by_one,
    create_relation, depends_on, has_many, has_one, where_ids,
};
pub use row::{FromValue, Row, RowCursor, RowError, Value};
pub use schema::{ModelSchema, SchemaRef};
pub use sql::{DatabaseType, quote_identifier};
pub use traits::{BoxFuture, QueryEngine, RowStream};

pub use logging::{LogConfig, LogFormat, init as init_logging, init_debug, init_with_level};

pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::context::ExecContext;
    pub use crate::error::{ErrorCode, QueryError, QueryResult};
    pub use crate::field::{FieldType, defer, ptr, row_scan};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::plan::ModelQuery;
    pub use crate::query::{QueryMod, SelectQuery, col, table_col};
    pub use crate::relations::{
        Relation, RelationKind, Resolve, bind_by, bind_by_one, create_relation, depends_on,
        has_many, has_one, where_ids,
    };
    pub use crate::row::{FromValue, Row, RowCursor, Value};
    pub use crate::schema::{ModelSchema, SchemaRef};
    pub use crate::sql::DatabaseType;
    pub use crate::traits::QueryEngine;
    pub use tokio_util::sync::CancellationToken;
}
