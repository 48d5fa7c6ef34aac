// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Structured query engine.
//!
//! ```text
//! SearchQueryBuilder (predicates, sorting, pagination)
//!     ↓
//!     ├─→ SqliteGrammar → objects table, FTS5 MATCH subselect
//!     └─→ MysqlGrammar  → fulltext_objects table, MATCH ... AGAINST
//! ```
//!
//! The builder accumulates conditions over the token-set columns the indexer
//! wrote, executes through [`IndexStore`](crate::store::IndexStore), and maps
//! hits back to live content items.

mod builder;
mod grammar;

pub use builder::{QueryOperand, SearchQueryBuilder};
pub use grammar::{Condition, MysqlGrammar, QueryGrammar, SqliteGrammar};
