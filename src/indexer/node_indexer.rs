// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Node indexer.
//!
//! Orchestrates one item's trip into the index: row-key resolution, property
//! and fulltext extraction, fulltext aggregation onto the nearest root, the
//! dedup-merge that folds repeated observations of one record into a single
//! row, and the fan-out that re-indexes a single item across every workspace
//! and dimension combination it is visible in.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::content::{
    AccessMode, ContentContext, ContentItem, ContentRepository, NodeTypeRegistry,
};
use crate::dimensions::{self, DimensionPresets};
use crate::error::IndexError;
use crate::extraction::{PropertyExtractor, RuleEvaluator};
use crate::identifier;
use crate::metrics;
use crate::query::QueryGrammar;
use crate::store::{IndexStore, SqlParam};
use crate::tokenset;

/// Per-pass dedup state.
///
/// Owned by one indexing-pass invocation and passed into every
/// [`NodeIndexer`] call of that pass; passes running in parallel each own
/// their own instance. Remembers which row keys this pass has already
/// written, so a repeated observation of the same record merges workspace
/// and dimension tokens into the existing row instead of duplicating it.
#[derive(Debug, Default)]
pub struct IndexingPass {
    seen: HashSet<String>,
}

impl IndexingPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the dedup state. Must be called between independent passes
    /// (e.g. once per workspace/dimension iteration of a full rebuild);
    /// otherwise a later pass merges its first encounter of an identifier
    /// into the earlier pass's row.
    pub fn flush(&mut self) {
        self.seen.clear();
    }

    fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    fn mark(&mut self, identifier: &str) {
        self.seen.insert(identifier.to_string());
    }
}

pub struct NodeIndexer {
    store: Arc<dyn IndexStore>,
    repository: Arc<dyn ContentRepository>,
    node_types: Arc<NodeTypeRegistry>,
    evaluator: Arc<dyn RuleEvaluator>,
    grammar: &'static dyn QueryGrammar,
    dimension_presets: DimensionPresets,
    max_ancestor_depth: usize,
}

impl NodeIndexer {
    pub fn new(
        store: Arc<dyn IndexStore>,
        repository: Arc<dyn ContentRepository>,
        node_types: Arc<NodeTypeRegistry>,
        evaluator: Arc<dyn RuleEvaluator>,
        grammar: &'static dyn QueryGrammar,
        dimension_presets: DimensionPresets,
        max_ancestor_depth: usize,
    ) -> Self {
        Self {
            store,
            repository,
            node_types,
            evaluator,
            grammar,
            dimension_presets,
            max_ancestor_depth,
        }
    }

    /// Index one item.
    ///
    /// With `expand_variants`, the item is not written directly: all indexed
    /// variants of its aggregate are swept out and the item is re-resolved
    /// and re-indexed in every (workspace, dimension-combination) context it
    /// exists in. This is the entry point for single-item updates; full
    /// rebuilds call with `expand_variants = false` per traversed item.
    pub async fn index_item(
        &self,
        pass: &mut IndexingPass,
        item: &ContentItem,
        target_workspace: Option<&str>,
        expand_variants: bool,
    ) -> Result<(), IndexError> {
        if !self.node_types.is_indexable(&item.type_name) {
            debug!(
                path = %item.path,
                node_type = %item.type_name,
                "Node skipped, type is not allowed in the index"
            );
            return Ok(());
        }

        if expand_variants {
            self.index_all_variants(pass, item).await
        } else {
            self.index_single(pass, item, target_workspace).await
        }
    }

    /// Delete the row for this item. Descendants are untouched; removing a
    /// subtree is the caller's loop.
    pub async fn remove_item(&self, item: &ContentItem) -> Result<(), IndexError> {
        let row_key = identifier::resolve(item);
        self.store.remove_data(&row_key).await?;
        metrics::record_removed();
        Ok(())
    }

    /// The one-variant path shared by rebuilds and the fan-out.
    async fn index_single(
        &self,
        pass: &mut IndexingPass,
        item: &ContentItem,
        target_workspace: Option<&str>,
    ) -> Result<(), IndexError> {
        let row_key = identifier::resolve(item);

        if item.removed {
            self.store.remove_data(&row_key).await?;
            metrics::record_removed();
            return Ok(());
        }

        if pass.contains(&row_key) {
            if let Some(mut row) = self.store.find_by_identifier(&row_key).await? {
                // Same record seen again under another workspace/variant:
                // widen the row's membership sets instead of duplicating it.
                row.remove("__identifier__");

                let workspace = target_workspace.unwrap_or(&item.workspace);
                let merged_workspaces = tokenset::append(
                    row.get("__workspace").map(String::as_str).unwrap_or(""),
                    workspace,
                );
                row.insert("__workspace".to_string(), merged_workspaces);

                let merged_dimensions = tokenset::append(
                    row.get("__dimensionshash").map(String::as_str).unwrap_or(""),
                    &item.dimension_hash(),
                );
                row.insert("__dimensionshash".to_string(), merged_dimensions);

                self.store.insert_or_update(&row, &row_key).await?;
                metrics::record_merged(workspace);
                return Ok(());
            }
        }

        let extractor = PropertyExtractor::new(&self.node_types, self.evaluator.as_ref());
        let (properties, mut fulltext) = extractor.extract(item, &row_key)?;

        // Fulltext surfaces at root granularity: once attributed to an
        // ancestor it does not stay on the fragment's own row.
        if !fulltext.is_empty() && self.add_fulltext_to_root(item, &fulltext).await? {
            fulltext.clear();
        }

        self.store.index_data(&row_key, &properties, &fulltext).await?;
        pass.mark(&row_key);
        metrics::record_indexed(&item.workspace);
        Ok(())
    }

    /// Sweep every indexed variant of this aggregate, then re-index the item
    /// in each context it resolves in. Reads run with [`AccessMode::System`]:
    /// the sweep must see all workspaces regardless of the caller's normal
    /// visibility, and the elevation ends with this call.
    async fn index_all_variants(
        &self,
        pass: &mut IndexingPass,
        item: &ContentItem,
    ) -> Result<(), IndexError> {
        let aggregate_id = &item.aggregate_id;

        let stale_variants = self
            .store
            .execute_statement(
                &self.grammar.find_identifiers_by_aggregate_id_sql(),
                &[SqlParam::Text(aggregate_id.clone())],
            )
            .await?;
        for variant in &stale_variants {
            if let Some(row_key) = variant.get("__identifier__") {
                self.store.remove_data(row_key).await?;
            }
        }

        let combinations = dimensions::calculate_combinations(&self.dimension_presets);

        for workspace in self.repository.workspaces().await? {
            if combinations.is_empty() {
                let context = ContentContext::without_dimensions(workspace.clone());
                self.index_in_context(pass, aggregate_id, &context).await?;
            } else {
                for combination in &combinations {
                    let context = ContentContext::new(workspace.clone(), combination.clone());
                    self.index_in_context(pass, aggregate_id, &context).await?;
                }
            }
        }

        Ok(())
    }

    async fn index_in_context(
        &self,
        pass: &mut IndexingPass,
        aggregate_id: &str,
        context: &ContentContext,
    ) -> Result<(), IndexError> {
        let resolved = self
            .repository
            .find_by_aggregate_id(aggregate_id, context, AccessMode::System)
            .await?;
        if let Some(variant) = resolved {
            self.index_single(pass, &variant, None).await?;
        }
        Ok(())
    }

    /// Attach extracted fulltext to the nearest strict ancestor whose type
    /// is a fulltext root. An item that is itself a root has no aggregation
    /// target; its fulltext stays on its own row. Returns whether a root
    /// took the fulltext.
    async fn add_fulltext_to_root(
        &self,
        item: &ContentItem,
        fulltext: &crate::store::FulltextBuckets,
    ) -> Result<bool, IndexError> {
        let Some(root) = self.find_fulltext_root(item).await? else {
            return Ok(false);
        };
        let root_key = identifier::resolve(&root);
        self.store.add_to_fulltext(fulltext, &root_key).await?;
        Ok(true)
    }

    async fn find_fulltext_root(
        &self,
        item: &ContentItem,
    ) -> Result<Option<ContentItem>, IndexError> {
        if self.node_types.is_fulltext_root(&item.type_name) {
            return Ok(None);
        }

        // Iterative walk with a depth bound: the tree is assumed acyclic,
        // the bound holds when it is not.
        let mut current = self.repository.parent_of(item).await?;
        let mut depth = 0;
        while let Some(ancestor) = current {
            if self.node_types.is_fulltext_root(&ancestor.type_name) {
                return Ok(Some(ancestor));
            }
            depth += 1;
            if depth >= self.max_ancestor_depth {
                debug!(
                    path = %item.path,
                    depth,
                    "Fulltext root walk hit the depth bound"
                );
                return Ok(None);
            }
            current = self.repository.parent_of(&ancestor).await?;
        }

        Ok(None)
    }
}
