//! Read-only seam to the content repository.
//!
//! The indexer and the query engine never own tree data; they resolve items
//! through this trait. Implementations adapt whatever actually stores the
//! tree (an ORM, an event-sourced graph, a fixture in tests).

use async_trait::async_trait;
use thiserror::Error;

use super::item::{ContentContext, ContentItem};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("content repository backend error: {0}")]
    Backend(String),
}

/// Read access level for repository lookups.
///
/// The variant fan-out has to see items in every workspace regardless of the
/// caller's own visibility, so the elevation is an explicit argument at each
/// call site rather than an ambient toggle. `System` must only be passed for
/// the duration of the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Normal visibility rules of the calling context.
    #[default]
    Frontend,
    /// Bypass visibility restrictions; reads across all workspaces.
    System,
}

#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Resolve a node by aggregate id inside a (workspace, dimensions)
    /// context. `None` when the node does not exist in that context.
    async fn find_by_aggregate_id(
        &self,
        aggregate_id: &str,
        context: &ContentContext,
        access: AccessMode,
    ) -> Result<Option<ContentItem>, RepositoryError>;

    /// Names of all workspaces.
    async fn workspaces(&self) -> Result<Vec<String>, RepositoryError>;

    /// Parent of an item in its own context, `None` at the root.
    async fn parent_of(&self, item: &ContentItem) -> Result<Option<ContentItem>, RepositoryError>;

    /// Root item of a context's tree, if the context resolves at all.
    async fn root(&self, context: &ContentContext) -> Result<Option<ContentItem>, RepositoryError>;

    /// All descendants of a root, in traversal order.
    async fn descendants_of(
        &self,
        root: &ContentItem,
    ) -> Result<Vec<ContentItem>, RepositoryError>;
}
