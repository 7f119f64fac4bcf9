//! Core traits for query execution.

use std::future::Future;
use std::pin::Pin;

use futures::stream::BoxStream;

use tokio_util::sync::CancellationToken;

use crate::error::QueryResult;
use crate::query::SelectQuery;
use crate::row::Row;
use crate::sql::DatabaseType;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A stream of rows produced by an engine.
pub type RowStream<'a> = BoxStream<'a, QueryResult<Row>>;

/// The database execution capability the resolver drives.
///
/// An engine renders a [`SelectQuery`] in its dialect, runs it and yields
/// rows whose cells are in projection order. The resolver consumes the
/// stream to completion for every query it issues.
///
/// When a cancellation token is passed, the engine owns in-flight
/// cancellation: once the token fires it must stop the running statement,
/// leave the connection usable for the next query and return
/// [`QueryError::cancelled`](crate::error::QueryError::cancelled).
///
/// # Example
///
/// ```rust,ignore
/// impl QueryEngine for MyEngine {
///     fn fetch<'a>(
///         &'a self,
///         query: &'a SelectQuery,
///         cancel: Option<&'a CancellationToken>,
///     ) -> BoxFuture<'a, QueryResult<RowStream<'a>>> {
///         Box::pin(async move {
///             let (sql, params) = query.to_sql(self.database_type())?;
///             let rows = self.run(&sql, params, cancel).await?;
///             Ok(futures::stream::iter(rows.into_iter().map(Ok)).boxed())
///         })
///     }
///
///     fn database_type(&self) -> DatabaseType {
///         DatabaseType::SQLite
///     }
/// }
/// ```
pub trait QueryEngine: Send + Sync {
    /// Execute a SELECT and stream its rows, stopping early once `cancel` fires.
    fn fetch<'a>(
        &'a self,
        query: &'a SelectQuery,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, QueryResult<RowStream<'a>>>;

    /// The SQL dialect this engine renders.
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }
}

impl<E: QueryEngine + ?Sized> QueryEngine for std::sync::Arc<E> {
    fn fetch<'a>(
        &'a self,
        query: &'a SelectQuery,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, QueryResult<RowStream<'a>>> {
        (**self).fetch(query, cancel)
    }

    fn database_type(&self) -> DatabaseType {
        (**self).database_type()
    }
}
