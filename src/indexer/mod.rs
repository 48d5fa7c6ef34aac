//! Indexing pipeline: the [`NodeIndexer`] and its per-pass dedup state.

mod node_indexer;

pub use node_indexer::{IndexingPass, NodeIndexer};
