//! # alacarte
//!
//! Load exactly the columns and relations a caller asks for.
//!
//! alacarte provides:
//! - Schemas describing how a record type is read from a table
//! - Dotted selection paths validated against those schemas
//! - Batched relation loading: one query per relation per nesting level
//! - An async SQLite engine (default `sqlite` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use alacarte::prelude::*;
//! use std::sync::LazyLock;
//!
//! #[derive(Debug, Default, Clone)]
//! pub struct Author {
//!     pub id: i64,
//!     pub name: String,
//!     pub books: Vec<Book>,
//! }
//!
//! #[derive(Debug, Default, Clone)]
//! pub struct Book {
//!     pub id: i64,
//!     pub author_id: i64,
//!     pub name: String,
//! }
//!
//! static BOOKS: LazyLock<ModelSchema<Book>> = LazyLock::new(|| {
//!     ModelSchema::new("books")
//!         .add_simple_field("id", |b: &mut Book| &mut b.id)
//!         .add_simple_field("author_id", |b: &mut Book| &mut b.author_id)
//!         .add_simple_field("name", |b: &mut Book| &mut b.name)
//! });
//!
//! static AUTHORS: LazyLock<ModelSchema<Author>> = LazyLock::new(|| {
//!     ModelSchema::new("authors")
//!         .add_simple_field("id", |a: &mut Author| &mut a.id)
//!         .add_simple_field("name", |a: &mut Author| &mut a.name)
//!         .add_relation(
//!             "books",
//!             has_many(
//!                 &BOOKS,
//!                 |a: &Author, b: &Book| a.id == b.author_id,
//!                 |a: &mut Author, books| a.books = books,
//!                 where_ids("author_id", |a: &Author| a.id),
//!                 depends_on(["id", "books.author_id"]),
//!             ),
//!         )
//! });
//!
//! #[tokio::main]
//! async fn main() -> Result<(), alacarte::QueryError> {
//!     let engine = SqliteEngine::open(SqliteConfig::from_url("sqlite://./library.db")?).await?;
//!
//!     let authors = AUTHORS
//!         .query(["name", "books.name"])
//!         .collect(&engine)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use alacarte_query::*;

/// The SQLite engine.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use alacarte_sqlite::*;
}

#[cfg(feature = "sqlite")]
pub use alacarte_sqlite::{SqliteConfig, SqliteEngine, SqliteError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use alacarte_query::prelude::*;

    #[cfg(feature = "sqlite")]
    pub use alacarte_sqlite::{SqliteConfig, SqliteEngine};
}
