// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index maintenance operations.
//!
//! The thin driver layer over the indexer and the store: full or
//! per-workspace rebuilds, index flush, engine optimization, and raw
//! statement passthrough for inspecting the index. A rebuild is the "pass
//! driver" the rest of the crate defers policy to: it owns the
//! [`IndexingPass`], flushes it between workspace/dimension iterations, and
//! decides that per-item extraction failures are skipped but counted.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::content::{ContentContext, ContentRepository, NodeTypeRegistry};
use crate::dimensions::{self, DimensionPresets};
use crate::error::IndexError;
use crate::extraction::{PropertyExtractor, RuleEvaluator};
use crate::indexer::{IndexingPass, NodeIndexer};
use crate::metrics;
use crate::store::{IndexProperties, IndexStore};

/// Outcome of one rebuild run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Identifies the run in logs.
    pub pass_id: String,
    /// Items written (fresh rows and dedup merges).
    pub indexed: usize,
    /// Items skipped because their extraction failed.
    pub failed: usize,
}

pub struct IndexCommands {
    indexer: Arc<NodeIndexer>,
    store: Arc<dyn IndexStore>,
    repository: Arc<dyn ContentRepository>,
    node_types: Arc<NodeTypeRegistry>,
    evaluator: Arc<dyn RuleEvaluator>,
    dimension_presets: DimensionPresets,
}

impl IndexCommands {
    pub fn new(
        indexer: Arc<NodeIndexer>,
        store: Arc<dyn IndexStore>,
        repository: Arc<dyn ContentRepository>,
        node_types: Arc<NodeTypeRegistry>,
        evaluator: Arc<dyn RuleEvaluator>,
        dimension_presets: DimensionPresets,
    ) -> Self {
        Self {
            indexer,
            store,
            repository,
            node_types,
            evaluator,
            dimension_presets,
        }
    }

    /// (Re-)index all workspaces, or a single one.
    ///
    /// Extraction failures abort the failing item only; the aggregate count
    /// is reported back so the operator sees them. Store errors abort the
    /// run.
    pub async fn build(&self, workspace: Option<&str>) -> Result<BuildReport, IndexError> {
        // Malformed rules fail here, before any item is touched.
        PropertyExtractor::new(&self.node_types, self.evaluator.as_ref())
            .validate_configuration()?;

        let pass_id = Uuid::new_v4().to_string();
        let workspaces = match workspace {
            Some(name) => vec![name.to_string()],
            None => self.repository.workspaces().await?,
        };
        let combinations = dimensions::calculate_combinations(&self.dimension_presets);

        let mut pass = IndexingPass::new();
        let mut report = BuildReport {
            pass_id: pass_id.clone(),
            indexed: 0,
            failed: 0,
        };

        for workspace in &workspaces {
            let contexts: Vec<ContentContext> = if combinations.is_empty() {
                vec![ContentContext::without_dimensions(workspace.clone())]
            } else {
                combinations
                    .iter()
                    .map(|c| ContentContext::new(workspace.clone(), c.clone()))
                    .collect()
            };

            for context in contexts {
                // A fresh dedup state per iteration: the first encounter of
                // an identifier in this context must be a fresh row, not a
                // merge into the previous iteration's row.
                pass.flush();
                let indexed = self
                    .index_context(&mut pass, &context, &mut report)
                    .await?;
                info!(
                    pass_id = %pass_id,
                    workspace = %context.workspace,
                    dimensions = %serde_json::to_string(&context.dimensions).unwrap_or_default(),
                    indexed,
                    "Workspace and dimension combination done"
                );
            }
        }

        if report.failed > 0 {
            warn!(
                pass_id = %pass_id,
                failed = report.failed,
                "Rebuild finished with skipped items"
            );
        }

        Ok(report)
    }

    async fn index_context(
        &self,
        pass: &mut IndexingPass,
        context: &ContentContext,
        report: &mut BuildReport,
    ) -> Result<usize, IndexError> {
        let Some(root) = self.repository.root(context).await? else {
            return Ok(0);
        };

        let mut indexed = 0;
        let mut items = vec![root.clone()];
        items.extend(self.repository.descendants_of(&root).await?);

        for item in &items {
            match self.indexer.index_item(pass, item, None, false).await {
                Ok(()) => indexed += 1,
                Err(IndexError::Extraction {
                    identifier,
                    message,
                }) => {
                    warn!(
                        identifier = %identifier,
                        path = %item.path,
                        %message,
                        "Skipping item, extraction failed"
                    );
                    metrics::record_index_error();
                    report.failed += 1;
                }
                Err(other) => return Err(other),
            }
        }

        report.indexed += indexed;
        Ok(indexed)
    }

    /// Clear the whole index.
    pub async fn flush_index(&self) -> Result<(), IndexError> {
        self.store.flush().await?;
        info!("The node index was flushed");
        Ok(())
    }

    /// Let the storage engine compact itself. Depending on the backend this
    /// rebuilds the database file, so do not interrupt it.
    pub async fn optimize_index(&self) -> Result<(), IndexError> {
        self.store.optimize().await?;
        info!("Index optimization finished");
        Ok(())
    }

    /// Raw statement passthrough for inspecting index content.
    pub async fn find(&self, statement: &str) -> Result<Vec<IndexProperties>, IndexError> {
        Ok(self.store.execute_statement(statement, &[]).await?)
    }
}
