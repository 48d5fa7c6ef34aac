// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Fluent structured query builder.
//!
//! Accumulates predicates, sorting and pagination against the index rows and
//! executes through the [`IndexStore`] seam. `scope_to` must come first: it
//! anchors the query to a subtree and to the calling context's workspace and
//! dimension variant, and every later call is meaningless without it.
//! Filter or sort calls on an unscoped builder poison it, and `execute` /
//! `count` report the ordering violation instead of running.
//!
//! Result rows are mapped back to live content items; rows whose item no
//! longer resolves (stale index entries) are dropped silently.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::grammar::{Condition, QueryGrammar};
use crate::content::{AccessMode, ContentContext, ContentItem, ContentRepository};
use crate::error::QueryError;
use crate::metrics;
use crate::store::{IndexStore, SqlParam};
use crate::tokenset;

/// Comparison operand: a literal, or a content item standing in for its
/// aggregate id.
#[derive(Debug, Clone)]
pub enum QueryOperand {
    Text(String),
    Number(f64),
}

impl QueryOperand {
    fn into_param(self) -> SqlParam {
        match self {
            QueryOperand::Text(v) => SqlParam::Text(v),
            QueryOperand::Number(v) => SqlParam::Numeric(v),
        }
    }

    fn as_text(&self) -> String {
        match self {
            QueryOperand::Text(v) => v.clone(),
            QueryOperand::Number(v) => v.to_string(),
        }
    }
}

impl From<&str> for QueryOperand {
    fn from(v: &str) -> Self {
        QueryOperand::Text(v.to_string())
    }
}

impl From<String> for QueryOperand {
    fn from(v: String) -> Self {
        QueryOperand::Text(v)
    }
}

impl From<f64> for QueryOperand {
    fn from(v: f64) -> Self {
        QueryOperand::Number(v)
    }
}

impl From<i64> for QueryOperand {
    fn from(v: i64) -> Self {
        QueryOperand::Number(v as f64)
    }
}

impl From<&ContentItem> for QueryOperand {
    fn from(item: &ContentItem) -> Self {
        QueryOperand::Text(item.aggregate_id.clone())
    }
}

pub struct SearchQueryBuilder {
    grammar: &'static dyn QueryGrammar,
    store: Arc<dyn IndexStore>,
    repository: Arc<dyn ContentRepository>,
    context: Option<ContentContext>,
    conditions: Vec<Condition>,
    sorting: Vec<String>,
    limit: Option<usize>,
    from: Option<usize>,
    log_enabled: bool,
    log_message: Option<String>,
    /// Set when a filter/sort/pagination call arrived before `scope_to`.
    unscoped_call: bool,
}

impl SearchQueryBuilder {
    pub fn new(
        grammar: &'static dyn QueryGrammar,
        store: Arc<dyn IndexStore>,
        repository: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            grammar,
            store,
            repository,
            context: None,
            conditions: Vec::new(),
            sorting: Vec::new(),
            limit: None,
            from: None,
            log_enabled: false,
            log_message: None,
            unscoped_call: false,
        }
    }

    /// Anchor the query: subtree of `context_item`, its workspace, its
    /// dimension variant. Must be the first call on the builder.
    pub fn scope_to(mut self, context_item: &ContentItem) -> Self {
        let path = &context_item.path;
        let subtree = Condition::new(
            format!(
                "({parent} LIKE ? OR {path_col} = ?)",
                parent = self.quote("__parentPath"),
                path_col = self.quote("__path"),
            ),
            vec![
                SqlParam::Text(tokenset::like_pattern(path)),
                SqlParam::Text(path.clone()),
            ],
        );
        let workspace = self.membership_condition("__workspace", &context_item.workspace);
        let dimensions =
            self.membership_condition("__dimensionshash", &context_item.dimension_hash());
        self.push_condition(subtree);
        self.push_condition(workspace);
        self.push_condition(dimensions);
        self.context = Some(context_item.context());
        self
    }

    /// Filter by node type, inheritance included: the type closure was
    /// expanded into `__typeAndSuperTypes` at index time.
    pub fn node_type(mut self, type_name: &str) -> Self {
        self.guard_scoped();
        let condition = self.membership_condition("__typeAndSuperTypes", type_name);
        self.push_condition(condition);
        self
    }

    pub fn exact_match(self, property: &str, value: impl Into<QueryOperand>) -> Self {
        self.comparison(property, "=", value.into())
    }

    pub fn like(mut self, property: &str, value: impl Into<QueryOperand>) -> Self {
        self.guard_scoped();
        let pattern = format!("%{}%", value.into().as_text());
        let condition = Condition::new(
            format!("{} LIKE ?", self.quote(property)),
            vec![SqlParam::Text(pattern)],
        );
        self.push_condition(condition);
        self
    }

    pub fn greater_than(self, property: &str, value: impl Into<QueryOperand>) -> Self {
        self.comparison(property, ">", value.into())
    }

    pub fn greater_than_or_equal(self, property: &str, value: impl Into<QueryOperand>) -> Self {
        self.comparison(property, ">=", value.into())
    }

    pub fn less_than(self, property: &str, value: impl Into<QueryOperand>) -> Self {
        self.comparison(property, "<", value.into())
    }

    pub fn less_than_or_equal(self, property: &str, value: impl Into<QueryOperand>) -> Self {
        self.comparison(property, "<=", value.into())
    }

    /// Match against the fulltext buckets and include hits by relevance.
    pub fn fulltext(mut self, term: &str) -> Self {
        self.guard_scoped();
        let condition = Condition::new(
            self.grammar.fulltext_match_condition(),
            vec![SqlParam::Text(term.to_string())],
        );
        self.push_condition(condition);
        self
    }

    pub fn sort_asc(mut self, property: &str) -> Self {
        self.guard_scoped();
        let clause = format!("{} ASC", self.quote(property));
        self.sorting.push(clause);
        self
    }

    pub fn sort_desc(mut self, property: &str) -> Self {
        self.guard_scoped();
        let clause = format!("{} DESC", self.quote(property));
        self.sorting.push(clause);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.guard_scoped();
        if limit > 0 {
            self.limit = Some(limit);
        }
        self
    }

    pub fn from(mut self, from: usize) -> Self {
        self.guard_scoped();
        if from > 0 {
            self.from = Some(from);
        }
        self
    }

    /// Log the executed query text and timing for diagnostics.
    pub fn log(mut self, message: &str) -> Self {
        self.log_enabled = true;
        self.log_message = Some(message.to_string());
        self
    }

    /// Run the query and map the rows back to live content items.
    ///
    /// Rows that no longer resolve are dropped; the returned sequence is
    /// deduplicated by aggregate id, in row order.
    pub async fn execute(self) -> Result<Vec<ContentItem>, QueryError> {
        let context = self.require_scope()?;
        let (sql, params) = self.build_select();

        metrics::record_query(self.grammar.name(), "execute");
        let started = Instant::now();
        let rows = self.store.execute_statement(&sql, &params).await?;
        metrics::record_query_latency(self.grammar.name(), started.elapsed());

        if self.log_enabled {
            debug!(
                "Query Log ({}): {} -- execution time: {} ms -- Total Results: {}",
                self.log_message.as_deref().unwrap_or(""),
                sql,
                started.elapsed().as_millis(),
                rows.len()
            );
        }

        let mut items = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        for row in rows {
            let Some(aggregate_id) = row.get("__identifier") else {
                continue;
            };
            if seen.iter().any(|s| s == aggregate_id) {
                continue;
            }
            seen.push(aggregate_id.clone());

            match self
                .repository
                .find_by_aggregate_id(aggregate_id, &context, AccessMode::Frontend)
                .await?
            {
                Some(item) => items.push(item),
                None => {
                    // Stale index entry: expected under eventual consistency
                    // between tree and index, never an error.
                    debug!(aggregate_id = %aggregate_id, "Dropping stale index row from results");
                    metrics::record_stale_dropped();
                }
            }
        }

        Ok(items)
    }

    /// Total hits for the accumulated predicates, without fetching rows.
    pub async fn count(self) -> Result<u64, QueryError> {
        self.require_scope()?;
        let (sql, params) = self.build_count();

        metrics::record_query(self.grammar.name(), "count");
        let started = Instant::now();
        let rows = self.store.execute_statement(&sql, &params).await?;
        metrics::record_query_latency(self.grammar.name(), started.elapsed());

        if self.log_enabled {
            debug!(
                "Query Log ({}): {} -- execution time: {} ms",
                self.log_message.as_deref().unwrap_or(""),
                sql,
                started.elapsed().as_millis(),
            );
        }

        let count = rows
            .first()
            .and_then(|row| row.get("cnt"))
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(count)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internal helpers
    // ═══════════════════════════════════════════════════════════════════════

    fn quote(&self, ident: &str) -> String {
        self.grammar.quote_ident(ident)
    }

    fn membership_condition(&self, column: &str, value: &str) -> Condition {
        Condition::new(
            format!("{} LIKE ?", self.quote(column)),
            vec![SqlParam::Text(tokenset::like_pattern(value))],
        )
    }

    fn comparison(mut self, property: &str, operator: &str, operand: QueryOperand) -> Self {
        self.guard_scoped();
        let condition = Condition::new(
            format!("{} {} ?", self.quote(property), operator),
            vec![operand.into_param()],
        );
        self.push_condition(condition);
        self
    }

    fn push_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    fn guard_scoped(&mut self) {
        if self.context.is_none() {
            self.unscoped_call = true;
        }
    }

    fn require_scope(&self) -> Result<ContentContext, QueryError> {
        match (&self.context, self.unscoped_call) {
            (Some(context), false) => Ok(context.clone()),
            _ => Err(QueryError::MissingScope),
        }
    }

    fn where_clause(&self) -> (String, Vec<SqlParam>) {
        let mut params = Vec::new();
        let clause = if self.conditions.is_empty() {
            "1=1".to_string()
        } else {
            self.conditions
                .iter()
                .map(|c| {
                    params.extend(c.params.iter().cloned());
                    format!("({})", c.sql)
                })
                .collect::<Vec<_>>()
                .join(" AND ")
        };
        (clause, params)
    }

    fn build_select(&self) -> (String, Vec<SqlParam>) {
        let (where_clause, mut params) = self.where_clause();

        // The insertion-order column breaks ties so equal sort keys keep a
        // stable, reproducible order.
        let mut order_by = self.sorting.clone();
        order_by.push(format!("{} ASC", self.grammar.insertion_order_column()));

        let mut sql = format!(
            "SELECT {id} FROM {table} WHERE {where_clause} ORDER BY {order}",
            id = self.quote("__identifier"),
            table = self.grammar.objects_table(),
            order = order_by.join(", "),
        );

        if self.limit.is_some() || self.from.is_some() {
            sql.push_str(" LIMIT ?");
            params.push(SqlParam::Integer(
                self.limit.map(|l| l as i64).unwrap_or(i64::MAX),
            ));
        }
        if let Some(from) = self.from {
            sql.push_str(" OFFSET ?");
            params.push(SqlParam::Integer(from as i64));
        }

        (sql, params)
    }

    fn build_count(&self) -> (String, Vec<SqlParam>) {
        let (where_clause, params) = self.where_clause();
        let sql = format!(
            "SELECT COUNT(*) AS cnt FROM {table} WHERE {where_clause}",
            table = self.grammar.objects_table(),
        );
        (sql, params)
    }
}
