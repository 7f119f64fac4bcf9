//! Relation descriptors.

use std::fmt;
use std::sync::Arc;

use crate::context::ExecContext;
use crate::error::QueryResult;
use crate::traits::BoxFuture;

/// Shape of a relation, recorded for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Every matching child is bound to the parent.
    HasMany,
    /// The first matching child is bound to the parent.
    HasOne,
    /// Bound by a caller-supplied binder.
    Custom,
}

impl RelationKind {
    /// Check if this relation binds a collection.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::HasMany)
    }

    /// Check if this relation binds a single record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::HasOne)
    }
}

/// The capability a relation exposes to the plan that selects it.
pub trait Resolve<M>: Send + Sync {
    /// Load the children of every parent in one batch and bind them.
    ///
    /// `fields` are the nested selection paths forwarded to the child.
    fn resolve<'a>(
        &'a self,
        ctx: ExecContext<'a>,
        parents: &'a mut [M],
        fields: Vec<String>,
    ) -> BoxFuture<'a, QueryResult<()>>;

    /// Validate a nested path against the child schema without executing.
    fn check(&self, path: &str) -> QueryResult<()>;

    /// Parent paths that must be selected for the binder and filter to work.
    fn depends_on(&self) -> &[String];
}

/// A type-erased relation registered on a parent schema.
pub struct Relation<M> {
    kind: RelationKind,
    inner: Arc<dyn Resolve<M>>,
}

impl<M> Relation<M> {
    /// Wrap a resolver.
    pub fn new<R>(kind: RelationKind, resolver: R) -> Self
    where
        R: Resolve<M> + 'static,
    {
        Self {
            kind,
            inner: Arc::new(resolver),
        }
    }

    /// The relation's shape.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// See [`Resolve::resolve`].
    pub fn resolve<'a>(
        &'a self,
        ctx: ExecContext<'a>,
        parents: &'a mut [M],
        fields: Vec<String>,
    ) -> BoxFuture<'a, QueryResult<()>> {
        self.inner.resolve(ctx, parents, fields)
    }

    /// See [`Resolve::check`].
    pub fn check(&self, path: &str) -> QueryResult<()> {
        self.inner.check(path)
    }

    /// See [`Resolve::depends_on`].
    pub fn depends_on(&self) -> &[String] {
        self.inner.depends_on()
    }
}

impl<M> Clone for Relation<M> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> fmt::Debug for Relation<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("kind", &self.kind)
            .field("depends_on", &self.depends_on())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_kind() {
        assert!(RelationKind::HasMany.is_many());
        assert!(!RelationKind::HasMany.is_one());
        assert!(RelationKind::HasOne.is_one());
        assert!(!RelationKind::Custom.is_many());
    }
}
