use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Flattened column → value map of one index row. Everything is stored as
/// text; structured values were flattened before they got here.
pub type IndexProperties = BTreeMap<String, String>;

/// Named fulltext buckets (`h1`..`h6`, `text`) of one row.
pub type FulltextBuckets = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("index store backend error: {0}")]
    Backend(String),
}

/// Bind parameter for a generated statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Numeric(f64),
    Integer(i64),
    Boolean(bool),
}

/// The persisted index the pipeline writes to and the query engine reads
/// from.
///
/// The core never assumes a dialect beyond what the query grammars generate;
/// everything dialect-specific lives behind this trait and the grammar.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Write a fresh row: properties plus fulltext buckets, keyed by
    /// `identifier`. Replaces any previous row with the same key.
    async fn index_data(
        &self,
        identifier: &str,
        properties: &IndexProperties,
        fulltext: &FulltextBuckets,
    ) -> Result<(), StoreError>;

    /// Write back a merged row read earlier with [`find_by_identifier`].
    ///
    /// [`find_by_identifier`]: IndexStore::find_by_identifier
    async fn insert_or_update(
        &self,
        properties: &IndexProperties,
        identifier: &str,
    ) -> Result<(), StoreError>;

    /// Append fulltext buckets onto an existing row, keeping what the row
    /// already carries in each bucket.
    async fn add_to_fulltext(
        &self,
        fulltext: &FulltextBuckets,
        identifier: &str,
    ) -> Result<(), StoreError>;

    /// Delete the row with this key. Deleting an absent row is not an error.
    async fn remove_data(&self, identifier: &str) -> Result<(), StoreError>;

    /// Read one row back as a column → value map, `None` when absent.
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<IndexProperties>, StoreError>;

    /// Run a generated statement with bound parameters and return the rows.
    async fn execute_statement(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<IndexProperties>, StoreError>;

    /// Drop all rows from the index.
    async fn flush(&self) -> Result<(), StoreError>;

    /// Let the engine compact itself (`VACUUM` / `OPTIMIZE TABLE`).
    async fn optimize(&self) -> Result<(), StoreError>;
}
