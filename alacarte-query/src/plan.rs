//! Selection plans: validated dotted paths and their batched execution.
//!
//! A plan is built from a schema and a list of dotted paths. Invalid paths
//! do not fail immediately; every error is kept and reported together as
//! one [`ErrorCode::InvalidSelect`](crate::error::ErrorCode) error when the
//! plan is executed, before any query runs.
//!
//! Execution issues one query for the base records and then one query per
//! selected relation per nesting level, whatever the number of parents.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::context::ExecContext;
use crate::error::{QueryError, QueryResult};
use crate::field::{FieldType, RowScan, concat, scan_row};
use crate::query::{QueryMod, SelectQuery, apply_mods};
use crate::relations::Relation;
use crate::schema::{ModelSchema, Segment};
use crate::traits::{BoxFuture, QueryEngine};

/// A per-request selection over one schema.
pub struct ModelQuery<'s, T> {
    schema: &'s ModelSchema<T>,
    selected_fields: IndexMap<&'s str, &'s FieldType<T>>,
    selected_relations: IndexMap<&'s str, &'s Relation<T>>,
    relation_fields: IndexMap<&'s str, Vec<String>>,
    query_mods: Vec<QueryMod>,
    errors: Vec<QueryError>,
    cancel: Option<CancellationToken>,
}

impl<'s, T> ModelQuery<'s, T> {
    pub(crate) fn new(schema: &'s ModelSchema<T>) -> Self {
        Self {
            schema,
            selected_fields: IndexMap::new(),
            selected_relations: IndexMap::new(),
            relation_fields: IndexMap::new(),
            query_mods: Vec::new(),
            errors: schema.conflicts(),
            cancel: None,
        }
    }

    /// Select more paths. An empty list selects every declared field.
    pub fn select<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut any = false;
        for path in paths {
            any = true;
            self.resolve_select(path.as_ref());
        }
        if !any {
            self.select_all_fields();
        }
        self
    }

    fn resolve_select(&mut self, path: &str) {
        let schema = self.schema;
        match schema.walk(path) {
            Ok(Segment::Empty) => {}
            Ok(Segment::All) => self.select_all_fields(),
            Ok(Segment::Relation {
                name,
                relation,
                rest,
            }) => self.select_relation(name, relation, rest),
            Ok(Segment::Field { name, field }) => {
                self.selected_fields.insert(name, field);
            }
            Err(err) => self.errors.push(err),
        }
    }

    fn select_all_fields(&mut self) {
        let schema = self.schema;
        for (name, field) in schema.fields() {
            self.selected_fields.insert(name, field);
        }
    }

    fn select_relation(&mut self, name: &'s str, relation: &'s Relation<T>, rest: &str) {
        let rest = if rest.is_empty() { "*" } else { rest };
        self.selected_relations.insert(name, relation);
        self.relation_fields
            .entry(name)
            .or_default()
            .push(rest.to_string());
    }

    /// Add an ad hoc modifier, applied after the schema's own modifiers.
    pub fn modify_query(mut self, modifier: QueryMod) -> Self {
        self.query_mods.push(modifier);
        self
    }

    /// Stop execution once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The schema this plan selects from.
    pub fn schema(&self) -> &'s ModelSchema<T> {
        self.schema
    }

    /// All accumulated selection errors folded into one, if any.
    pub fn err(&self) -> Option<QueryError> {
        if self.errors.is_empty() {
            return None;
        }
        Some(QueryError::invalid_selection(self.schema.table(), &self.errors))
    }

    /// The individual selection errors.
    pub fn errors(&self) -> &[QueryError] {
        &self.errors
    }

    /// Selected field names in selection order.
    pub fn selected_fields(&self) -> impl Iterator<Item = &'s str> {
        self.selected_fields.keys().copied()
    }

    /// Selected relation names in selection order.
    pub fn selected_relations(&self) -> impl Iterator<Item = &'s str> {
        self.selected_relations.keys().copied()
    }

    /// Nested paths forwarded to a selected relation.
    pub fn relation_fields(&self, name: &str) -> Option<&[String]> {
        self.relation_fields.get(name).map(Vec::as_slice)
    }

    /// The base statement after dependency paths were applied.
    pub fn base_query(&self) -> QueryResult<SelectQuery> {
        Ok(self.prepare()?.build_query())
    }

    fn fork(&self) -> Self {
        Self {
            schema: self.schema,
            selected_fields: self.selected_fields.clone(),
            selected_relations: self.selected_relations.clone(),
            relation_fields: self.relation_fields.clone(),
            query_mods: self.query_mods.clone(),
            errors: Vec::new(),
            cancel: self.cancel.clone(),
        }
    }

    /// Copy the plan and select every dependency path of its relations,
    /// including relations only reached through another dependency.
    fn prepare(&self) -> QueryResult<Self> {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let mut plan = self.fork();
        let mut next = 0;
        while next < plan.selected_relations.len() {
            let relation = plan.selected_relations[next];
            let depends = relation.depends_on();
            // An empty list would select every field.
            if !depends.is_empty() {
                plan = plan.select(depends);
            }
            next += 1;
        }

        match plan.err() {
            Some(err) => Err(err),
            None => Ok(plan),
        }
    }

    fn build_query(&self) -> SelectQuery {
        let table = self.schema.table();
        let query = SelectQuery::new(table);
        let query = apply_mods(query, table, self.schema.query_mods());
        let query = apply_mods(query, table, &self.query_mods);
        self.selected_fields
            .values()
            .fold(query, |q, field| field.modifier.apply(q, table))
    }

    fn context<'q>(&'q self, engine: &'q dyn QueryEngine) -> ExecContext<'q> {
        let ctx = ExecContext::new(engine);
        match &self.cancel {
            Some(token) => ctx.with_cancellation(token),
            None => ctx,
        }
    }
}

impl<'s, T> ModelQuery<'s, T>
where
    T: Default + Send + 'static,
{
    /// Execute the plan and return every matching record.
    #[instrument(skip_all, fields(table = %self.schema.table()))]
    pub async fn collect(&self, engine: &dyn QueryEngine) -> QueryResult<Vec<T>> {
        self.collect_in(self.context(engine)).await
    }

    /// Execute the plan and return its only record.
    ///
    /// Zero or several base records fail before any relation is loaded.
    #[instrument(skip_all, fields(table = %self.schema.table()))]
    pub async fn collect_one(&self, engine: &dyn QueryEngine) -> QueryResult<T> {
        let ctx = self.context(engine);
        let (plan, mut records) = self.collect_base(ctx).await?;

        if records.is_empty() {
            return Err(QueryError::not_found(self.schema.table()));
        }
        if records.len() > 1 {
            return Err(QueryError::not_unique(self.schema.table(), records.len()));
        }

        plan.resolve_relations(ctx, &mut records).await?;
        records
            .pop()
            .ok_or_else(|| QueryError::not_found(self.schema.table()))
    }

    /// Execute within an existing context, as relations do for their children.
    pub fn collect_in<'q>(&'q self, ctx: ExecContext<'q>) -> BoxFuture<'q, QueryResult<Vec<T>>> {
        Box::pin(async move {
            let (plan, mut records) = self.collect_base(ctx).await?;
            plan.resolve_relations(ctx, &mut records).await?;
            Ok(records)
        })
    }

    async fn collect_base(&self, ctx: ExecContext<'_>) -> QueryResult<(ModelQuery<'s, T>, Vec<T>)> {
        let plan = self.prepare()?;
        ctx.check_cancelled()?;

        let query = plan.build_query();
        let scan = concat(
            plan.selected_fields
                .values()
                .map(|field| Arc::clone(&field.row_scan))
                .collect(),
        );

        debug!(
            table = %self.schema.table(),
            columns = ?query.projected(),
            "collecting records"
        );
        let records = fetch_all(ctx, &query, &scan).await?;
        trace!(table = %self.schema.table(), rows = records.len(), "collected records");

        Ok((plan, records))
    }

    async fn resolve_relations(&self, ctx: ExecContext<'_>, records: &mut [T]) -> QueryResult<()> {
        for (name, relation) in &self.selected_relations {
            ctx.check_cancelled()?;
            let fields = self.relation_fields.get(name).cloned().unwrap_or_default();
            debug!(table = %self.schema.table(), relation = %name, "loading relation");
            relation.resolve(ctx, records, fields).await?;
        }
        Ok(())
    }
}

/// How long an engine may take to honor a fired token before its fetch is
/// abandoned.
const CANCEL_GRACE: Duration = Duration::from_millis(500);

/// Run one query and scan all of its rows.
///
/// The token is handed to the engine, which stops the running statement
/// itself. A fetch still pending [`CANCEL_GRACE`] after the token fired is
/// dropped. The row stream is dropped before returning on every path.
async fn fetch_all<T: Default>(
    ctx: ExecContext<'_>,
    query: &SelectQuery,
    scan: &RowScan<T>,
) -> QueryResult<Vec<T>> {
    let fetch = async {
        let mut rows = ctx.engine().fetch(query, ctx.cancellation()).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await {
            ctx.check_cancelled()?;
            records.push(scan_row(row?, scan)?);
        }
        Ok::<_, QueryError>(records)
    };

    match ctx.cancellation() {
        Some(token) => tokio::select! {
            biased;
            result = fetch => result,
            _ = abandon_after_grace(token) => {
                warn!(table = %query.table(), "engine ignored cancellation, abandoning fetch");
                Err(QueryError::cancelled())
            }
        },
        None => fetch.await,
    }
}

async fn abandon_after_grace(token: &CancellationToken) {
    token.cancelled().await;
    tokio::time::sleep(CANCEL_GRACE).await;
}

impl<T> fmt::Debug for ModelQuery<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelQuery")
            .field("table", &self.schema.table())
            .field("fields", &self.selected_fields.keys().collect::<Vec<_>>())
            .field("relations", &self.relation_fields)
            .field("query_mods", &self.query_mods.len())
            .field("errors", &self.errors.len())
            .finish()
    }
}
