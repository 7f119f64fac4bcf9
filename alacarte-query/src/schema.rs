//! The schema registry: one record type mapped onto one table.
//!
//! A schema is declared once at startup and then only read. Every builder
//! method consumes the schema and returns the updated value, so a schema
//! already shared behind an `Arc` or a `LazyLock` can never change.
//!
//! ```rust
//! use alacarte_query::prelude::*;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Book {
//!     id: i64,
//!     name: String,
//! }
//!
//! let books = ModelSchema::<Book>::new("books")
//!     .add_simple_field("id", |b: &mut Book| &mut b.id)
//!     .add_simple_field("name", |b: &mut Book| &mut b.name);
//!
//! assert!(books.check("name").is_ok());
//! assert!(books.check("title").is_err());
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{QueryError, QueryResult};
use crate::field::{FieldType, RowScan};
use crate::plan::ModelQuery;
use crate::query::QueryMod;
use crate::relations::Relation;
use crate::row::FromValue;

/// Fields, relations and always-applied modifiers of one record type.
pub struct ModelSchema<T> {
    table: String,
    fields: IndexMap<String, FieldType<T>>,
    relations: IndexMap<String, Relation<T>>,
    query_mods: Vec<QueryMod>,
    conflicts: Vec<String>,
}

/// What the first segment of a dotted path resolved to.
pub(crate) enum Segment<'s, 'p, T> {
    /// The empty path.
    Empty,
    /// `*`: every declared field.
    All,
    /// A relation plus the (possibly empty) remainder forwarded to it.
    Relation {
        name: &'s str,
        relation: &'s Relation<T>,
        rest: &'p str,
    },
    /// A leaf field.
    Field {
        name: &'s str,
        field: &'s FieldType<T>,
    },
}

impl<T> ModelSchema<T> {
    /// Create an empty schema for a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: IndexMap::new(),
            relations: IndexMap::new(),
            query_mods: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Register a field from its projection and scan.
    pub fn add_field(self, name: impl Into<String>, modifier: QueryMod, row_scan: RowScan<T>) -> Self {
        self.add_field_type(name, FieldType::new(modifier, row_scan))
    }

    /// Register a prepared field descriptor.
    pub fn add_field_type(mut self, name: impl Into<String>, field: FieldType<T>) -> Self {
        let name = name.into();
        if self.relations.contains_key(&name) {
            self.record_conflict(&name);
        }
        self.fields.insert(name, field);
        self
    }

    /// Register a field whose single column has the same name.
    pub fn add_simple_field<V, F>(self, name: impl Into<String>, f: F) -> Self
    where
        T: 'static,
        V: FromValue,
        F: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let name = name.into();
        let field = FieldType::simple(&name, f);
        self.add_field_type(name, field)
    }

    /// Register a relation.
    pub fn add_relation(mut self, name: impl Into<String>, relation: Relation<T>) -> Self {
        let name = name.into();
        if self.fields.contains_key(&name) {
            self.record_conflict(&name);
        }
        self.relations.insert(name, relation);
        self
    }

    /// Add a modifier applied to every query against this schema.
    pub fn modify_query(mut self, modifier: QueryMod) -> Self {
        self.query_mods.push(modifier);
        self
    }

    fn record_conflict(&mut self, name: &str) {
        warn!(
            table = %self.table,
            name = %name,
            "field and relation registered under the same name"
        );
        if !self.conflicts.iter().any(|c| c == name) {
            self.conflicts.push(name.to_string());
        }
    }

    /// The table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Field names in registration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Relation names in registration order.
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Check if a field is declared.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Check if a relation is declared.
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Look up a field.
    pub fn field(&self, name: &str) -> Option<&FieldType<T>> {
        self.fields.get(name)
    }

    /// Look up a relation.
    pub fn relation(&self, name: &str) -> Option<&Relation<T>> {
        self.relations.get(name)
    }

    /// Modifiers applied to every query.
    pub fn query_mods(&self) -> &[QueryMod] {
        &self.query_mods
    }

    /// One error per name registered as both a field and a relation.
    pub fn conflicts(&self) -> Vec<QueryError> {
        self.conflicts
            .iter()
            .map(|name| QueryError::schema_conflict(&self.table, name))
            .collect()
    }

    /// Fail if the schema has definition conflicts.
    pub fn validate(&self) -> QueryResult<()> {
        match self.conflicts.first() {
            Some(name) => Err(QueryError::schema_conflict(&self.table, name)),
            None => Ok(()),
        }
    }

    /// Validate one dotted path without executing anything.
    pub fn check(&self, path: &str) -> QueryResult<()> {
        self.walk(path).map(|_| ())
    }

    /// Start a selection plan.
    ///
    /// An empty list selects every declared field.
    pub fn query<I, S>(&self, paths: I) -> ModelQuery<'_, T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ModelQuery::new(self).select(paths)
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&str, &FieldType<T>)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Resolve the first segment of `path`.
    ///
    /// Relations win over fields. A relation remainder other than `*` is
    /// checked against the child schema.
    pub(crate) fn walk<'s, 'p>(&'s self, path: &'p str) -> QueryResult<Segment<'s, 'p, T>> {
        if path.is_empty() {
            return Ok(Segment::Empty);
        }

        let (head, rest) = path.split_once('.').unwrap_or((path, ""));

        if head == "*" {
            if !rest.is_empty() {
                return Err(QueryError::no_such_relation(&self.table, head));
            }
            return Ok(Segment::All);
        }

        if self.conflicts.iter().any(|c| c == head) {
            return Err(QueryError::schema_conflict(&self.table, head));
        }

        if let Some((name, relation)) = self.relations.get_key_value(head) {
            if !rest.is_empty() && rest != "*" {
                relation.check(rest)?;
            }
            return Ok(Segment::Relation {
                name: name.as_str(),
                relation,
                rest,
            });
        }

        if let Some((name, field)) = self.fields.get_key_value(head) {
            if !rest.is_empty() {
                return Err(QueryError::no_such_relation(&self.table, head));
            }
            return Ok(Segment::Field {
                name: name.as_str(),
                field,
            });
        }

        Err(QueryError::no_such_field(&self.table, head))
    }
}

impl<T> Clone for ModelSchema<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            fields: self.fields.clone(),
            relations: self.relations.clone(),
            query_mods: self.query_mods.clone(),
            conflicts: self.conflicts.clone(),
        }
    }
}

impl<T> fmt::Debug for ModelSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSchema")
            .field("table", &self.table)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .field("query_mods", &self.query_mods.len())
            .finish()
    }
}

/// How a relation reaches its child schema.
///
/// `Lazy` points at a `static` that is only initialized on first use,
/// which lets two schemas refer to each other.
pub enum SchemaRef<N: 'static> {
    /// An owned, shareable schema.
    Shared(Arc<ModelSchema<N>>),
    /// A lazily initialized static schema.
    Lazy(&'static LazyLock<ModelSchema<N>>),
}

impl<N> SchemaRef<N> {
    /// The child schema.
    pub fn get(&self) -> &ModelSchema<N> {
        match self {
            Self::Shared(schema) => schema,
            Self::Lazy(schema) => schema,
        }
    }
}

impl<N> Deref for SchemaRef<N> {
    type Target = ModelSchema<N>;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl<N> Clone for SchemaRef<N> {
    fn clone(&self) -> Self {
        match self {
            Self::Shared(schema) => Self::Shared(Arc::clone(schema)),
            Self::Lazy(schema) => Self::Lazy(schema),
        }
    }
}

impl<N> From<ModelSchema<N>> for SchemaRef<N> {
    fn from(schema: ModelSchema<N>) -> Self {
        Self::Shared(Arc::new(schema))
    }
}

impl<N> From<Arc<ModelSchema<N>>> for SchemaRef<N> {
    fn from(schema: Arc<ModelSchema<N>>) -> Self {
        Self::Shared(schema)
    }
}

impl<N> From<&'static LazyLock<ModelSchema<N>>> for SchemaRef<N> {
    fn from(schema: &'static LazyLock<ModelSchema<N>>) -> Self {
        Self::Lazy(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::field::ptr;
    use crate::query::col;
    use crate::relations::{depends_on, has_many, where_ids};

    #[derive(Debug, Default, Clone)]
    struct Author {
        id: i64,
        name: String,
        books: Vec<Book>,
    }

    #[derive(Debug, Default, Clone)]
    struct Book {
        id: i64,
        author_id: i64,
        name: String,
    }

    fn books() -> ModelSchema<Book> {
        ModelSchema::new("books")
            .add_simple_field("id", |b: &mut Book| &mut b.id)
            .add_simple_field("author_id", |b: &mut Book| &mut b.author_id)
            .add_simple_field("name", |b: &mut Book| &mut b.name)
    }

    fn authors() -> ModelSchema<Author> {
        ModelSchema::new("authors")
            .add_simple_field("id", |a: &mut Author| &mut a.id)
            .add_field("name", col(["name"]), ptr(|a: &mut Author| &mut a.name))
            .add_relation(
                "books",
                has_many(
                    books(),
                    |a: &Author, b: &Book| a.id == b.author_id,
                    |a: &mut Author, books| a.books = books,
                    where_ids("author_id", |a: &Author| a.id),
                    depends_on(["id", "books.author_id"]),
                ),
            )
    }

    #[test]
    fn test_registration_order() {
        let schema = authors();
        assert_eq!(schema.table(), "authors");
        assert_eq!(schema.field_names().collect::<Vec<_>>(), ["id", "name"]);
        assert_eq!(schema.relation_names().collect::<Vec<_>>(), ["books"]);
        assert!(schema.has_relation("books"));
        assert!(!schema.has_field("books"));
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_check_valid_paths() {
        let schema = authors();
        for path in ["", "*", "id", "books", "books.*", "books.name", "books.author_id"] {
            assert!(schema.check(path).is_ok(), "{path} should be valid");
        }
    }

    #[test]
    fn test_check_invalid_paths() {
        let schema = authors();

        let err = schema.check("nickname").unwrap_err();
        assert_eq!(err.code, ErrorCode::NoSuchField);
        assert!(err.message.contains("nickname"));

        let err = schema.check("name.first").unwrap_err();
        assert_eq!(err.code, ErrorCode::NoSuchRelation);

        let err = schema.check("*.name").unwrap_err();
        assert_eq!(err.code, ErrorCode::NoSuchRelation);

        // Nested errors come from the child schema.
        let err = schema.check("books.title").unwrap_err();
        assert_eq!(err.code, ErrorCode::NoSuchField);
        assert_eq!(err.context.model.as_deref(), Some("books"));
    }

    #[test]
    fn test_builder_does_not_affect_snapshots() {
        let base = books();
        let extended = base.clone().add_simple_field("title", |b: &mut Book| &mut b.name);
        assert!(!base.has_field("title"));
        assert!(extended.has_field("title"));
    }

    #[test]
    fn test_conflict_is_a_definition_error() {
        let schema = authors().add_simple_field("books", |a: &mut Author| &mut a.name);

        let err = schema.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaConflict);
        assert_eq!(schema.conflicts().len(), 1);

        let err = schema.check("books").unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaConflict);
        assert!(schema.check("id").is_ok());
    }

    #[test]
    fn test_lazy_schema_ref() {
        static BOOKS: LazyLock<ModelSchema<Book>> = LazyLock::new(books);

        let lazy: SchemaRef<Book> = (&BOOKS).into();
        let shared: SchemaRef<Book> = books().into();
        assert_eq!(lazy.table(), "books");
        assert_eq!(shared.field_names().count(), 3);
    }
}
