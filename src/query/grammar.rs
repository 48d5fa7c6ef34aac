// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Dialect grammars for the structured query builder.
//!
//! The two reference backends differ only in identifier quoting, the name of
//! the objects table, fulltext-match syntax, and which column carries the
//! insertion order. Everything else the builder generates is dialect-free.

use crate::store::SqlParam;

pub trait QueryGrammar: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Table carrying the index rows.
    fn objects_table(&self) -> &'static str;

    fn quote_ident(&self, ident: &str) -> String;

    /// Condition matching rows whose fulltext buckets match one bound term.
    fn fulltext_match_condition(&self) -> String;

    /// Column that reproduces the original insertion order, used as the
    /// final tie-break sort.
    fn insertion_order_column(&self) -> &'static str;

    /// Statement selecting the row keys of every indexed variant of one
    /// aggregate id (one bound parameter). Drives the stale-variant sweep of
    /// the fan-out re-index.
    fn find_identifiers_by_aggregate_id_sql(&self) -> String {
        format!(
            "SELECT {key} FROM {table} WHERE {aggregate} = ?",
            key = self.quote_ident("__identifier__"),
            table = self.objects_table(),
            aggregate = self.quote_ident("__identifier"),
        )
    }
}

/// Grammar for the embedded single-file engine.
///
/// Fulltext matching goes through an external FTS5 table mirroring the
/// bucket columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGrammar;

impl QueryGrammar for SqliteGrammar {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn objects_table(&self) -> &'static str {
        "objects"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident)
    }

    fn fulltext_match_condition(&self) -> String {
        "\"__identifier__\" IN (SELECT \"__identifier__\" FROM fulltext_index WHERE fulltext_index MATCH ?)".to_string()
    }

    fn insertion_order_column(&self) -> &'static str {
        "rowid"
    }
}

/// Grammar for the networked relational engine.
///
/// Fulltext matching uses the native `MATCH ... AGAINST` over the bucket
/// columns' FULLTEXT key.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlGrammar;

impl QueryGrammar for MysqlGrammar {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn objects_table(&self) -> &'static str {
        "fulltext_objects"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident)
    }

    fn fulltext_match_condition(&self) -> String {
        "MATCH (`h1`, `h2`, `h3`, `h4`, `h5`, `h6`, `text`) AGAINST (? IN BOOLEAN MODE)"
            .to_string()
    }

    fn insertion_order_column(&self) -> &'static str {
        "sequence_number"
    }
}

/// A condition fragment plus its bound parameters, in placeholder order.
#[derive(Debug, Clone)]
pub struct Condition {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Condition {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}
