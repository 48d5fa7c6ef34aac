//! # Content Search
//!
//! A relational full-text search index for hierarchical, workspace- and
//! dimension-versioned content trees.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Indexing Pipeline                       │
//! │  • NodeIndexer: one row per (item, workspace, variant)     │
//! │  • IndexingPass dedup: repeated observations merge         │
//! │  • Fulltext bubbles to the nearest root-flagged ancestor   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                      (writes index rows)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    IndexStore (SQL)                         │
//! │  • SQLite (embedded, FTS5) or MySQL (FULLTEXT)             │
//! │  • Set-valued fields as '#token#' strings in text columns  │
//! │  • Membership = LIKE '%#token#%', no join tables           │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                      (reads index rows)
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Structured Query Engine                     │
//! │  • scope_to(subtree, workspace, variant) first, always     │
//! │  • Inheritance-aware type filter via pre-expanded closure  │
//! │  • Hits map back to live items; stale rows drop silently   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use content_search::{
//!     IndexingPass, NodeIndexer, SearchQueryBuilder, SqlIndexStore,
//! };
//! # use content_search::{ContentRepository, NodeTypeRegistry, RuleEvaluator};
//! # async fn example(
//! #     repository: Arc<dyn ContentRepository>,
//! #     node_types: Arc<NodeTypeRegistry>,
//! #     evaluator: Arc<dyn RuleEvaluator>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqlIndexStore::new("sqlite:index.db?mode=rwc").await?);
//! let grammar = store.grammar();
//!
//! let indexer = NodeIndexer::new(
//!     store.clone(),
//!     repository.clone(),
//!     node_types,
//!     evaluator,
//!     grammar,
//!     Default::default(),
//!     100,
//! );
//!
//! // Index one item across every workspace and dimension variant.
//! let mut pass = IndexingPass::new();
//! # let item = todo!();
//! indexer.index_item(&mut pass, &item, None, true).await?;
//!
//! // Search the subtree below a context item.
//! let hits = SearchQueryBuilder::new(grammar, store, repository)
//!     .scope_to(&item)
//!     .node_type("acme:page")
//!     .fulltext("hello")
//!     .sort_desc("title")
//!     .limit(20)
//!     .execute()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`indexer`]: the [`NodeIndexer`] and per-pass dedup state
//! - [`query`]: the fluent [`SearchQueryBuilder`] and dialect grammars
//! - [`store`]: the [`IndexStore`] seam and its SQL implementation
//! - [`content`]: item snapshots, node types, the repository seam
//! - [`extraction`]: property rules and fulltext bucketing
//! - [`dimensions`]: dimension presets and combination enumeration
//! - [`commands`]: rebuild / flush / optimize drivers

pub mod commands;
pub mod config;
pub mod content;
pub mod dimensions;
pub mod error;
pub mod extraction;
pub mod identifier;
pub mod indexer;
pub mod metrics;
pub mod query;
pub mod store;
pub mod tokenset;

pub use commands::{BuildReport, IndexCommands};
pub use config::SearchConfig;
pub use content::{
    AccessMode, ContentContext, ContentItem, ContentRepository, NodeTypeDefinition,
    NodeTypeRegistry, PropertySearchSettings, RepositoryError,
};
pub use dimensions::{DimensionAxis, DimensionCombination, DimensionPreset, DimensionPresets};
pub use error::{EvaluationError, IndexError, QueryError};
pub use extraction::{EvaluationContext, PropertyExtractor, RuleEvaluator};
pub use indexer::{IndexingPass, NodeIndexer};
pub use query::{MysqlGrammar, QueryGrammar, QueryOperand, SearchQueryBuilder, SqliteGrammar};
pub use store::{
    FulltextBuckets, IndexProperties, IndexStore, SqlIndexStore, SqlParam, StoreError,
};
