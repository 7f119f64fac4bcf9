//! Batched relation loading and the relation constructors.
//!
//! A bound relation loads the children of a whole parent slice with one
//! query: the filter builder turns the parents into a constraint (usually
//! `child.fk IN (parent keys)`), the child plan runs with the forwarded
//! nested paths, and the binder distributes the children onto the parents.
//!
//! ```rust
//! use alacarte_query::prelude::*;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Author {
//!     id: i64,
//!     books: Vec<Book>,
//! }
//!
//! #[derive(Debug, Default, Clone)]
//! struct Book {
//!     id: i64,
//!     author_id: i64,
//! }
//!
//! let books = ModelSchema::<Book>::new("books")
//!     .add_simple_field("id", |b: &mut Book| &mut b.id)
//!     .add_simple_field("author_id", |b: &mut Book| &mut b.author_id);
//!
//! let authors = ModelSchema::<Author>::new("authors")
//!     .add_simple_field("id", |a: &mut Author| &mut a.id)
//!     .add_relation(
//!         "books",
//!         has_many(
//!             books,
//!             |a: &Author, b: &Book| a.id == b.author_id,
//!             |a: &mut Author, books| a.books = books,
//!             where_ids("author_id", |a: &Author| a.id),
//!             depends_on(["id", "books.author_id"]),
//!         ),
//!     );
//!
//! assert!(authors.check("books.author_id").is_ok());
//! ```

use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::ExecContext;
use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue};
use crate::query::{QueryMod, table_col};
use crate::schema::SchemaRef;
use crate::traits::BoxFuture;

use super::relation::{Relation, RelationKind, Resolve};

/// Distributes loaded children onto their parents.
pub type Binder<M, N> = Arc<dyn Fn(&mut [M], Vec<N>) + Send + Sync>;

/// Turns the materialized parents into the child query's constraint.
pub type FilterBuilder<M> = Arc<dyn Fn(&[M]) -> QueryMod + Send + Sync>;

/// A relation bound to a child schema.
pub struct BoundRelation<M, N: 'static> {
    child: SchemaRef<N>,
    binder: Binder<M, N>,
    filter: FilterBuilder<M>,
    depends: Vec<String>,
}

impl<M, N> BoundRelation<M, N> {
    /// Bind a child schema with a binder, a filter builder and the parent
    /// paths both depend on.
    pub fn new<B, F>(child: impl Into<SchemaRef<N>>, binder: B, filter: F, depends: Vec<String>) -> Self
    where
        B: Fn(&mut [M], Vec<N>) + Send + Sync + 'static,
        F: Fn(&[M]) -> QueryMod + Send + Sync + 'static,
    {
        Self {
            child: child.into(),
            binder: Arc::new(binder),
            filter: Arc::new(filter),
            depends,
        }
    }

    /// The child schema.
    pub fn child(&self) -> &SchemaRef<N> {
        &self.child
    }
}

impl<M, N> Resolve<M> for BoundRelation<M, N>
where
    M: Send + 'static,
    N: Default + Send + 'static,
{
    fn resolve<'a>(
        &'a self,
        ctx: ExecContext<'a>,
        parents: &'a mut [M],
        fields: Vec<String>,
    ) -> BoxFuture<'a, QueryResult<()>> {
        Box::pin(async move {
            let schema = self.child.get();
            debug!(
                table = %schema.table(),
                parents = parents.len(),
                fields = ?fields,
                "resolving relation"
            );

            let filter = (self.filter)(parents);
            let plan = schema.query(&fields).modify_query(filter);
            let children = plan.collect_in(ctx).await?;

            trace!(table = %schema.table(), children = children.len(), "binding children");
            (self.binder)(parents, children);
            Ok(())
        })
    }

    fn check(&self, path: &str) -> QueryResult<()> {
        self.child.get().check(path)
    }

    fn depends_on(&self) -> &[String] {
        &self.depends
    }
}

/// A has-many relation: every parent receives all matching children, in
/// child query order; no match yields an empty `Vec`.
pub fn has_many<M, N, B, A, F>(
    child: impl Into<SchemaRef<N>>,
    belongs: B,
    assign: A,
    filter: F,
    depends: Vec<String>,
) -> Relation<M>
where
    M: Send + 'static,
    N: Default + Clone + Send + 'static,
    B: Fn(&M, &N) -> bool + Send + Sync + 'static,
    A: Fn(&mut M, Vec<N>) + Send + Sync + 'static,
    F: Fn(&[M]) -> QueryMod + Send + Sync + 'static,
{
    Relation::new(
        RelationKind::HasMany,
        BoundRelation::new(child, bind_by(belongs, assign), filter, depends),
    )
}

/// A has-one relation: every parent receives the first matching child;
/// without a match the parent keeps its default.
pub fn has_one<M, N, B, A, F>(
    child: impl Into<SchemaRef<N>>,
    belongs: B,
    assign: A,
    filter: F,
    depends: Vec<String>,
) -> Relation<M>
where
    M: Send + 'static,
    N: Default + Clone + Send + 'static,
    B: Fn(&M, &N) -> bool + Send + Sync + 'static,
    A: Fn(&mut M, N) + Send + Sync + 'static,
    F: Fn(&[M]) -> QueryMod + Send + Sync + 'static,
{
    Relation::new(
        RelationKind::HasOne,
        BoundRelation::new(child, bind_by_one(belongs, assign), filter, depends),
    )
}

/// A relation with a custom binder.
pub fn create_relation<M, N, B, F>(
    child: impl Into<SchemaRef<N>>,
    binder: B,
    filter: F,
    depends: Vec<String>,
) -> Relation<M>
where
    M: Send + 'static,
    N: Default + Send + 'static,
    B: Fn(&mut [M], Vec<N>) + Send + Sync + 'static,
    F: Fn(&[M]) -> QueryMod + Send + Sync + 'static,
{
    Relation::new(
        RelationKind::Custom,
        BoundRelation::new(child, binder, filter, depends),
    )
}

/// Binder assigning every matching child to each parent.
pub fn bind_by<M, N, B, A>(belongs: B, assign: A) -> impl Fn(&mut [M], Vec<N>) + Send + Sync + 'static
where
    M: 'static,
    N: Clone + 'static,
    B: Fn(&M, &N) -> bool + Send + Sync + 'static,
    A: Fn(&mut M, Vec<N>) + Send + Sync + 'static,
{
    move |parents: &mut [M], children: Vec<N>| {
        for parent in parents.iter_mut() {
            let matched: Vec<N> = children
                .iter()
                .filter(|child| belongs(&*parent, child))
                .cloned()
                .collect();
            assign(parent, matched);
        }
    }
}

/// Binder assigning the first matching child to each parent.
pub fn bind_by_one<M, N, B, A>(belongs: B, assign: A) -> impl Fn(&mut [M], Vec<N>) + Send + Sync + 'static
where
    M: 'static,
    N: Clone + 'static,
    B: Fn(&M, &N) -> bool + Send + Sync + 'static,
    A: Fn(&mut M, N) + Send + Sync + 'static,
{
    move |parents: &mut [M], children: Vec<N>| {
        for parent in parents.iter_mut() {
            if let Some(child) = children.iter().find(|child| belongs(&*parent, child)) {
                assign(parent, child.clone());
            }
        }
    }
}

/// Filter builder constraining the child's `column` to the parents' keys.
///
/// An empty parent slice renders a constraint that matches nothing.
pub fn where_ids<M, K, G>(column: impl Into<String>, key: G) -> impl Fn(&[M]) -> QueryMod + Send + Sync + 'static
where
    M: 'static,
    K: Into<FilterValue>,
    G: Fn(&M) -> K + Send + Sync + 'static,
{
    let column = column.into();
    move |parents: &[M]| {
        let ids: Vec<FilterValue> = parents.iter().map(|parent| key(parent).into()).collect();
        let column = column.clone();
        QueryMod::new(move |q, table| q.filter(Filter::In(table_col(table, &column), ids.clone())))
    }
}

/// Parent paths a relation depends on.
pub fn depends_on<I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    paths.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SelectQuery;
    use crate::sql::DatabaseType;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Parent {
        id: i64,
        children: Vec<Child>,
        first: Option<Child>,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Child {
        id: i64,
        parent_id: i64,
    }

    fn child(id: i64, parent_id: i64) -> Child {
        Child { id, parent_id }
    }

    fn parents() -> Vec<Parent> {
        [1, 2, 3]
            .into_iter()
            .map(|id| Parent {
                id,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_bind_by_keeps_child_order() {
        let binder = bind_by(
            |p: &Parent, c: &Child| p.id == c.parent_id,
            |p: &mut Parent, children| p.children = children,
        );
        let mut parents = parents();
        binder(
            &mut parents,
            vec![child(30, 1), child(10, 2), child(20, 1)],
        );

        assert_eq!(parents[0].children, vec![child(30, 1), child(20, 1)]);
        assert_eq!(parents[1].children, vec![child(10, 2)]);
        // No match assigns an empty collection.
        assert!(parents[2].children.is_empty());
    }

    #[test]
    fn test_bind_by_one_takes_first_match() {
        let binder = bind_by_one(
            |p: &Parent, c: &Child| p.id == c.parent_id,
            |p: &mut Parent, c| p.first = Some(c),
        );
        let mut parents = parents();
        binder(&mut parents, vec![child(7, 2), child(8, 2), child(9, 1)]);

        assert_eq!(parents[0].first, Some(child(9, 1)));
        assert_eq!(parents[1].first, Some(child(7, 2)));
        assert_eq!(parents[2].first, None);
    }

    #[test]
    fn test_where_ids_filters_on_parent_keys() {
        let build = where_ids("parent_id", |p: &Parent| p.id);
        let modifier = build(&parents());
        let q = modifier.apply(SelectQuery::new("children").column("children.id"), "children");

        let (sql, params) = q.to_sql(DatabaseType::SQLite).unwrap();
        assert_eq!(
            sql,
            "SELECT children.id FROM children WHERE children.parent_id IN (?, ?, ?)"
        );
        assert_eq!(
            params,
            vec![FilterValue::Int(1), FilterValue::Int(2), FilterValue::Int(3)]
        );
    }

    #[test]
    fn test_where_ids_without_parents_matches_nothing() {
        let build = where_ids("parent_id", |p: &Parent| p.id);
        let q = build(&[]).apply(SelectQuery::new("children").column("children.id"), "children");

        let (sql, params) = q.to_sql(DatabaseType::SQLite).unwrap();
        assert_eq!(sql, "SELECT children.id FROM children WHERE FALSE");
        assert!(params.is_empty());
    }

    #[test]
    fn test_depends_on() {
        assert_eq!(depends_on(["id", "books.author_id"]), vec!["id", "books.author_id"]);
    }
}
