//! The SELECT statement accumulator and query modifiers.
//!
//! A [`SelectQuery`] only collects a table, projected columns, joins, filters,
//! ordering and paging; [`SelectQuery::to_sql`] renders it for a dialect.
//! Schemas, fields and relations shape queries exclusively through
//! [`QueryMod`] values.

use std::fmt;
use std::sync::Arc;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::sql::{DatabaseType, quote_identifier};

/// A SELECT statement under construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    joins: Vec<String>,
    filters: Vec<Filter>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    /// Start a query against a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Add a projected column.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Add several projected columns.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add a filter; filters are combined with AND.
    pub fn filter(mut self, filter: Filter) -> Self {
        if !filter.is_none() {
            self.filters.push(filter);
        }
        self
    }

    /// Add an arbitrary WHERE expression with `?` parameter markers.
    pub fn where_raw(self, sql: impl Into<String>, params: Vec<FilterValue>) -> Self {
        self.filter(Filter::raw(sql, params))
    }

    /// Add a JOIN clause verbatim (e.g. `"JOIN books ON books.author_id = authors.id"`).
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    /// Add an ORDER BY expression verbatim.
    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order_by.push(expr.into());
        self
    }

    /// Limit the number of rows.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip rows.
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// The base table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Projected columns in projection order.
    pub fn projected(&self) -> &[String] {
        &self.columns
    }

    /// Accumulated filters.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Render the statement and its parameters.
    pub fn to_sql(&self, db: DatabaseType) -> QueryResult<(String, Vec<FilterValue>)> {
        if self.columns.is_empty() {
            return Err(QueryError::invalid_query(format!(
                "select on {} must project at least one column",
                self.table
            ))
            .with_model(&self.table));
        }

        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.columns.join(", "),
            quote_identifier(&self.table)
        );

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.filters.is_empty() {
            let parts: Vec<_> = self
                .filters
                .iter()
                .map(|f| f.write_sql(db, &mut params))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&parts.join(" AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        Ok((sql, params))
    }
}

/// A reusable transformation of a [`SelectQuery`].
///
/// Modifiers receive the table alias so they can qualify their columns.
#[derive(Clone)]
pub struct QueryMod(Arc<dyn Fn(SelectQuery, &str) -> SelectQuery + Send + Sync>);

impl QueryMod {
    /// Wrap a closure as a modifier.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(SelectQuery, &str) -> SelectQuery + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Apply the modifier.
    pub fn apply(&self, query: SelectQuery, table: &str) -> SelectQuery {
        (self.0)(query, table)
    }

    /// Modifier adding a filter that does not depend on the table alias.
    pub fn filter(filter: Filter) -> Self {
        Self::new(move |q, _| q.filter(filter.clone()))
    }

    /// Modifier adding a raw WHERE expression.
    pub fn where_raw(sql: impl Into<String>, params: Vec<FilterValue>) -> Self {
        let sql = sql.into();
        Self::new(move |q, _| q.where_raw(sql.clone(), params.clone()))
    }
}

impl fmt::Debug for QueryMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueryMod")
    }
}

/// Modifier projecting one or more columns of the current table.
pub fn col<I, S>(names: I) -> QueryMod
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    QueryMod::new(move |q, table| q.columns(names.iter().map(|name| table_col(table, name))))
}

/// Qualify a column with its table: `table.column`, or bare `column` without a table.
pub fn table_col(table: &str, name: &str) -> String {
    if table.is_empty() {
        return quote_identifier(name);
    }
    format!("{}.{}", quote_identifier(table), quote_identifier(name))
}

pub(crate) fn apply_mods(query: SelectQuery, table: &str, mods: &[QueryMod]) -> SelectQuery {
    mods.iter().fold(query, |q, m| m.apply(q, table))
}
