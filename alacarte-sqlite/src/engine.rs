//! SQLite query engine implementation.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use alacarte_query::CancellationToken;
use alacarte_query::error::{QueryError, QueryResult};
use alacarte_query::filter::FilterValue;
use alacarte_query::query::SelectQuery;
use alacarte_query::row::Row;
use alacarte_query::sql::DatabaseType;
use alacarte_query::traits::{BoxFuture, QueryEngine, RowStream};
use futures::StreamExt;
use futures::stream;
use rusqlite::InterruptHandle;
use tokio_rusqlite::Connection;
use tracing::{debug, instrument, trace};

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};
use crate::types::{from_sqlite, to_sqlite};

/// Pause between interrupts while a cancelled statement winds down.
const INTERRUPT_RETRY: Duration = Duration::from_millis(10);

/// SQLite query engine over a single background connection.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct SqliteEngine {
    conn: Connection,
    interrupt: Arc<InterruptHandle>,
    config: Arc<SqliteConfig>,
}

impl SqliteEngine {
    /// Open the database described by `config` and apply its pragmas.
    #[instrument(skip_all, fields(memory = config.path.is_memory()))]
    pub async fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await,
            DatabasePath::File(path) => Connection::open(path).await,
        }
        .map_err(|e| SqliteError::connection(e.to_string()))?;

        let init_sql = config.init_sql();
        let interrupt = conn
            .call(move |conn| {
                conn.execute_batch(&init_sql)?;
                Ok(conn.get_interrupt_handle())
            })
            .await?;

        debug!("sqlite connection opened");
        Ok(Self {
            conn,
            interrupt: Arc::new(interrupt),
            config: Arc::new(config),
        })
    }

    /// Open a private in-memory database.
    pub async fn memory() -> SqliteResult<Self> {
        Self::open(SqliteConfig::memory()).await
    }

    /// The configuration the engine was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Run several `;`-separated statements, e.g. schema setup.
    pub async fn execute_batch(&self, sql: impl Into<String>) -> SqliteResult<()> {
        let sql = sql.into();
        debug!(sql = %sql, "executing batch");
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Run one statement with `?` parameters and return the changed row count.
    pub async fn execute(&self, sql: impl Into<String>, params: Vec<FilterValue>) -> SqliteResult<usize> {
        let sql = sql.into();
        debug!(sql = %sql, params = params.len(), "executing statement");
        self.conn
            .call(move |conn| {
                let values: Vec<_> = params.iter().map(to_sqlite).collect();
                let changed = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
                Ok(changed)
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Run a query and materialize its rows in column order.
    pub async fn query(&self, sql: impl Into<String>, params: Vec<FilterValue>) -> SqliteResult<Vec<Row>> {
        self.run_query(sql.into(), params, None).await
    }

    /// Like [`query`](Self::query), but stops the statement once `token` fires.
    ///
    /// The running statement is interrupted and the connection stays usable.
    /// A cancelled query returns [`SqliteError::Cancelled`].
    pub async fn query_with_cancellation(
        &self,
        sql: impl Into<String>,
        params: Vec<FilterValue>,
        token: &CancellationToken,
    ) -> SqliteResult<Vec<Row>> {
        self.run_query(sql.into(), params, Some(token)).await
    }

    async fn run_query(
        &self,
        sql: String,
        params: Vec<FilterValue>,
        cancel: Option<&CancellationToken>,
    ) -> SqliteResult<Vec<Row>> {
        debug!(sql = %sql, params = params.len(), "executing query");
        let guard = cancel.cloned();
        let run = self.conn.call(move |conn| {
            // Queued behind another call and cancelled meanwhile.
            if guard.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Ok(None);
            }

            let mut stmt = conn.prepare(&sql)?;
            let width = stmt.column_count();
            let values: Vec<_> = params.iter().map(to_sqlite).collect();
            let mut cursor = stmt.query(rusqlite::params_from_iter(values.iter()))?;

            let mut rows = Vec::new();
            while let Some(row) = cursor.next()? {
                let mut cells = Vec::with_capacity(width);
                for i in 0..width {
                    cells.push(from_sqlite(row.get_ref(i)?));
                }
                rows.push(Row::new(cells));
            }
            Ok(Some(rows))
        });

        let outcome = match cancel {
            None => run.await?,
            Some(token) => {
                tokio::pin!(run);
                let finished = tokio::select! {
                    biased;
                    result = &mut run => Some(result?),
                    _ = token.cancelled() => None,
                };
                match finished {
                    Some(outcome) => outcome,
                    None => {
                        self.interrupt_until_done(run).await;
                        None
                    }
                }
            }
        };

        let rows = outcome.ok_or(SqliteError::Cancelled)?;
        trace!(rows = rows.len(), "query returned");
        Ok(rows)
    }

    /// Interrupt the connection until the pending call returns.
    ///
    /// An interrupt only reaches a statement that is already stepping, so it
    /// is repeated while the call may still be waiting for the connection.
    async fn interrupt_until_done<F: Future>(&self, mut run: Pin<&mut F>) {
        debug!("interrupting cancelled statement");
        loop {
            self.interrupt.interrupt();
            tokio::select! {
                _ = run.as_mut() => return,
                _ = tokio::time::sleep(INTERRUPT_RETRY) => {}
            }
        }
    }
}

impl QueryEngine for SqliteEngine {
    fn fetch<'a>(
        &'a self,
        query: &'a SelectQuery,
        cancel: Option<&'a CancellationToken>,
    ) -> BoxFuture<'a, QueryResult<RowStream<'a>>> {
        Box::pin(async move {
            let (sql, params) = query.to_sql(DatabaseType::SQLite)?;
            let rows = self
                .run_query(sql.clone(), params, cancel)
                .await
                .map_err(|e| QueryError::from(e).with_model(query.table()).with_sql(sql))?;
            Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
        })
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }
}

impl std::fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alacarte_query::error::ErrorCode;
    use alacarte_query::filter::Filter;
    use alacarte_query::row::Value;
    use futures::TryStreamExt;
    use pretty_assertions::assert_eq;

    async fn engine() -> SqliteEngine {
        let engine = SqliteEngine::memory().await.unwrap();
        engine
            .execute_batch(
                "CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL, active BOOLEAN);
                 INSERT INTO authors VALUES (1, 'Jeff', 1), (2, 'Sam', 0), (3, 'Ann', NULL);",
            )
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn test_fetch_projects_in_order() {
        let engine = engine().await;
        let query = SelectQuery::new("authors")
            .column("authors.name")
            .column("authors.id")
            .filter(Filter::In(
                "authors.id".into(),
                vec![FilterValue::Int(1), FilterValue::Int(3)],
            ))
            .order_by("authors.id");

        let rows: Vec<Row> = engine.fetch(&query, None).await.unwrap().try_collect().await.unwrap();
        let values: Vec<Vec<Value>> = rows.into_iter().map(|r| r.values().to_vec()).collect();
        assert_eq!(
            values,
            vec![
                vec![Value::Text("Jeff".into()), Value::Int(1)],
                vec![Value::Text("Ann".into()), Value::Int(3)],
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_empty_in_matches_nothing() {
        let engine = engine().await;
        let query = SelectQuery::new("authors")
            .column("authors.id")
            .filter(Filter::In("authors.id".into(), Vec::new()));

        let rows: Vec<Row> = engine.fetch(&query, None).await.unwrap().try_collect().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_execute_with_params() {
        let engine = engine().await;
        let changed = engine
            .execute(
                "UPDATE authors SET name = ? WHERE id = ?",
                vec![FilterValue::String("Jeffrey".into()), FilterValue::Int(1)],
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let rows = engine
            .query("SELECT name, active FROM authors WHERE id = ?", vec![FilterValue::Int(1)])
            .await
            .unwrap();
        assert_eq!(rows[0].values(), &[Value::Text("Jeffrey".into()), Value::Int(1)]);
    }

    #[tokio::test]
    async fn test_fetch_error_carries_sql() {
        let engine = engine().await;
        let query = SelectQuery::new("missing").column("missing.id");

        let err = match engine.fetch(&query, None).await {
            Ok(_) => panic!("query against a missing table succeeded"),
            Err(err) => err,
        };
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(
            err.context.sql.as_deref(),
            Some("SELECT missing.id FROM missing")
        );
    }

    #[tokio::test]
    async fn test_foreign_keys_pragma_applied() {
        let engine = engine().await;
        let rows = engine.query("PRAGMA foreign_keys", Vec::new()).await.unwrap();
        assert_eq!(rows[0].values(), &[Value::Int(1)]);
    }

    const SLOW_COUNT: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000000000) \
         SELECT count(*) FROM c";

    #[tokio::test]
    async fn test_cancellation_interrupts_running_statement() {
        let engine = engine().await;
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            engine.query_with_cancellation(SLOW_COUNT, Vec::new(), &token),
        )
        .await
        .expect("cancelled statement kept running");
        assert!(matches!(result, Err(SqliteError::Cancelled)));

        let rows = tokio::time::timeout(
            Duration::from_secs(2),
            engine.query("SELECT count(*) FROM authors", Vec::new()),
        )
        .await
        .expect("connection stayed busy after cancellation")
        .unwrap();
        assert_eq!(rows[0].values(), &[Value::Int(3)]);
    }

    #[tokio::test]
    async fn test_fetch_with_fired_token_never_runs() {
        let engine = engine().await;
        let token = CancellationToken::new();
        token.cancel();

        let query = SelectQuery::new("authors").column("authors.id");
        let err = match engine.fetch(&query, Some(&token)).await {
            Ok(_) => panic!("fetch ran after cancellation"),
            Err(err) => err,
        };
        assert!(err.is_cancelled());
        assert_eq!(err.context.model.as_deref(), Some("authors"));
    }
}
