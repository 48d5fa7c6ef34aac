//! Index storage: the [`IndexStore`] seam and its SQL implementation.

mod sql;
mod traits;

pub use sql::{SqlIndexStore, FULLTEXT_BUCKETS};
pub use traits::{FulltextBuckets, IndexProperties, IndexStore, SqlParam, StoreError};
