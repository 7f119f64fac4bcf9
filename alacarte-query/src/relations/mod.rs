//! Relations between schemas and their batched loading.
//!
//! A relation is registered on the parent schema under a name. Selecting it
//! (`"books"`, `"books.name"`, `"books.comments.name"`) makes the plan load
//! the children of every parent with a single query per nesting level and
//! bind them back in place.
//!
//! ## Example
//!
//! ```rust,ignore
//! let authors = ModelSchema::<Author>::new("authors")
//!     .add_simple_field("id", |a: &mut Author| &mut a.id)
//!     .add_relation(
//!         "books",
//!         has_many(
//!             &BOOKS,
//!             |a: &Author, b: &Book| a.id == b.author_id,
//!             |a: &mut Author, books| a.books = books,
//!             where_ids("author_id", |a: &Author| a.id),
//!             depends_on(["id", "books.author_id"]),
//!         ),
//!     );
//!
//! let authors = authors
//!     .query(["name", "books.name"])
//!     .collect(&engine)
//!     .await?;
//! ```

mod loader;
mod relation;

pub use loader::{
    Binder, BoundRelation, FilterBuilder, bind_by, bind_by_one, create_relation, depends_on,
    has_many, has_one, where_ids,
};
pub use relation::{Relation, RelationKind, Resolve};
