//! Execution context threaded through one resolution.

use tokio_util::sync::CancellationToken;

use crate::error::{QueryError, QueryResult};
use crate::traits::QueryEngine;

/// The engine and cancellation signal shared by every query of one resolution.
///
/// Relations receive the context of the plan that selected them, so a
/// cancellation observed by the parent also stops every nested fetch.
#[derive(Clone, Copy)]
pub struct ExecContext<'a> {
    engine: &'a dyn QueryEngine,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> ExecContext<'a> {
    /// Create a context without cancellation.
    pub fn new(engine: &'a dyn QueryEngine) -> Self {
        Self {
            engine,
            cancel: None,
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The engine executing queries.
    pub fn engine(&self) -> &'a dyn QueryEngine {
        self.engine
    }

    /// The cancellation token, if any.
    pub fn cancellation(&self) -> Option<&'a CancellationToken> {
        self.cancel
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }

    /// Fail with [`QueryError::cancelled`] once cancellation was requested.
    pub fn check_cancelled(&self) -> QueryResult<()> {
        if self.is_cancelled() {
            return Err(QueryError::cancelled());
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExecContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecContext")
            .field("database_type", &self.engine.database_type())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
