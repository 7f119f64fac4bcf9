//! In-memory engine for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::query::SelectQuery;
use crate::row::{Row, Value};
use crate::traits::{BoxFuture, QueryEngine, RowStream};

struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Serves `Equals`/`In` filtered projections of in-memory tables and
/// records every query it receives.
#[derive(Default)]
pub(crate) struct MockEngine {
    tables: HashMap<String, Table>,
    log: Mutex<Vec<SelectQuery>>,
    fail_on: Option<String>,
    cancel_after: Option<(usize, CancellationToken)>,
    hang_on: Option<(String, CancellationToken)>,
    ignore_cancel: bool,
    cancelled: AtomicUsize,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_table(mut self, name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.tables.insert(
            name.to_string(),
            Table {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        );
        self
    }

    /// Fail every query against `table`.
    pub(crate) fn fail_on(mut self, table: &str) -> Self {
        self.fail_on = Some(table.to_string());
        self
    }

    /// Cancel `token` once `n` queries were received.
    pub(crate) fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    /// Cancel `token` when `table` is queried, then wait for the fetch's
    /// own token and answer `Cancelled`.
    pub(crate) fn hang_on(mut self, table: &str, token: CancellationToken) -> Self {
        self.hang_on = Some((table.to_string(), token));
        self
    }

    /// Never answer a hanging fetch, even once its token fired.
    pub(crate) fn ignoring_cancellation(mut self) -> Self {
        self.ignore_cancel = true;
        self
    }

    /// Fetches that stopped because their token fired.
    pub(crate) fn cancelled_fetches(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> Vec<SelectQuery> {
        self.log.lock().clone()
    }

    pub(crate) fn query_count(&self) -> usize {
        self.log.lock().len()
    }

    fn evaluate(&self, query: &SelectQuery) -> QueryResult<Vec<Row>> {
        let table = self
            .tables
            .get(query.table())
            .ok_or_else(|| QueryError::database(format!("no such table: {}", query.table())))?;

        let index = |column: &str| {
            let bare = column.rsplit('.').next().unwrap_or(column);
            table.columns.iter().position(|c| c == bare)
        };

        let rows = table
            .rows
            .iter()
            .filter(|row| {
                query.filters().iter().all(|filter| match filter {
                    Filter::Equals(column, value) => {
                        index(column).is_some_and(|i| matches(&row[i], value))
                    }
                    Filter::In(column, values) => index(column)
                        .is_some_and(|i| values.iter().any(|value| matches(&row[i], value))),
                    _ => true,
                })
            })
            .map(|row| {
                let values = query
                    .projected()
                    .iter()
                    .map(|column| index(column).map_or(Value::Null, |i| row[i].clone()))
                    .collect();
                Row::new(values)
            })
            .collect();

        Ok(rows)
    }
}

fn matches(value: &Value, filter: &FilterValue) -> bool {
    match (value, filter) {
        (Value::Int(a), FilterValue::Int(b)) => a == b,
        (Value::Text(a), FilterValue::String(b)) => a == b,
        (Value::Bool(a), FilterValue::Bool(b)) => a == b,
        (Value::Null, FilterValue::Null) => true,
        _ => false,
    }
}

impl QueryEngine for MockEngine {
    fn fetch<'a>(
        &'a self,
        query: &'a SelectQuery,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, QueryResult<RowStream<'a>>> {
        Box::pin(async move {
            let count = {
                let mut log = self.log.lock();
                log.push(query.clone());
                log.len()
            };

            if let Some((n, token)) = &self.cancel_after {
                if count >= *n {
                    token.cancel();
                }
            }

            if let Some((table, token)) = &self.hang_on {
                if table == query.table() {
                    token.cancel();
                    match cancel {
                        Some(cancel) if !self.ignore_cancel => {
                            cancel.cancelled().await;
                            self.cancelled.fetch_add(1, Ordering::SeqCst);
                            return Err(QueryError::cancelled());
                        }
                        _ => std::future::pending::<()>().await,
                    }
                }
            }

            if self.fail_on.as_deref() == Some(query.table()) {
                return Err(QueryError::database(format!("{} is unavailable", query.table())));
            }

            let rows = self.evaluate(query)?;
            Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
        })
    }
}
