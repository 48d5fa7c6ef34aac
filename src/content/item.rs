//! Content item value types.
//!
//! A [`ContentItem`] is one observation of a node in the content tree: the
//! node as seen from exactly one workspace under exactly one dimension
//! combination. The tree itself lives behind the
//! [`ContentRepository`](super::repository::ContentRepository) seam; the
//! indexer only reads these snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dimensions::{combination_hash, DimensionCombination};

/// The (workspace, dimension-combination) context an item is observed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentContext {
    pub workspace: String,
    #[serde(default)]
    pub dimensions: DimensionCombination,
}

impl ContentContext {
    pub fn new(workspace: impl Into<String>, dimensions: DimensionCombination) -> Self {
        Self {
            workspace: workspace.into(),
            dimensions,
        }
    }

    /// Context without dimensions, for trees that configure no axes.
    pub fn without_dimensions(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            dimensions: DimensionCombination::new(),
        }
    }

    /// Hash token for this context's dimension combination.
    pub fn dimension_hash(&self) -> String {
        combination_hash(&self.dimensions)
    }
}

/// One observation of a content node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Logical node identity, shared by all workspace/dimension variants.
    pub aggregate_id: String,
    /// Identity of the stored record backing this observation. Variants that
    /// fall through to an unmodified base record share it, which is what
    /// lets them converge onto one index row.
    pub record_id: String,
    /// Aggregate-id path from the root, `/`-separated.
    pub path: String,
    /// Path of the parent, `None` for the root.
    pub parent_path: Option<String>,
    /// Node type name.
    pub type_name: String,
    /// Workspace this observation was made in.
    pub workspace: String,
    /// Dimension combination this observation was made under.
    #[serde(default)]
    pub dimensions: DimensionCombination,
    /// Property bag.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    /// Tombstone flag: the node is marked removed in the source tree but not
    /// physically deleted.
    #[serde(default)]
    pub removed: bool,
}

impl ContentItem {
    pub fn new(
        aggregate_id: impl Into<String>,
        record_id: impl Into<String>,
        type_name: impl Into<String>,
        path: impl Into<String>,
        workspace: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let parent_path = parent_of_path(&path);
        Self {
            aggregate_id: aggregate_id.into(),
            record_id: record_id.into(),
            path,
            parent_path,
            type_name: type_name.into(),
            workspace: workspace.into(),
            dimensions: DimensionCombination::new(),
            properties: BTreeMap::new(),
            removed: false,
        }
    }

    pub fn with_dimensions(mut self, dimensions: DimensionCombination) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_removed(mut self, removed: bool) -> Self {
        self.removed = removed;
        self
    }

    /// The context this observation belongs to.
    pub fn context(&self) -> ContentContext {
        ContentContext::new(self.workspace.clone(), self.dimensions.clone())
    }

    /// Hash token of this observation's dimension combination.
    pub fn dimension_hash(&self) -> String {
        combination_hash(&self.dimensions)
    }
}

/// Parent path of a `/`-separated path; `None` at the root.
pub fn parent_of_path(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    let (parent, _) = trimmed.rsplit_once('/')?;
    if parent.is_empty() {
        Some("/".to_string())
    } else {
        Some(parent.to_string())
    }
}

/// All prefixes of a path, shortest first.
///
/// `foo/bar/baz` → `foo`, `foo/bar`, `foo/bar/baz`. Works for absolute and
/// relative paths; `/` yields itself.
pub fn path_prefixes(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    if path == "/" {
        return vec!["/".to_string()];
    }

    let absolute = path.starts_with('/');
    let mut current = if absolute { String::from("/") } else { String::new() };
    let mut prefixes = Vec::new();
    for part in path.trim_start_matches('/').split('/') {
        if !current.is_empty() && current != "/" {
            current.push('/');
        }
        current.push_str(part);
        prefixes.push(current.clone());
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_of_path() {
        assert_eq!(parent_of_path("a/b/c"), Some("a/b".to_string()));
        assert_eq!(parent_of_path("/a/b"), Some("/a".to_string()));
        assert_eq!(parent_of_path("/a"), Some("/".to_string()));
        assert_eq!(parent_of_path("a"), None);
    }

    #[test]
    fn test_path_prefixes_relative() {
        assert_eq!(path_prefixes("foo/bar/baz"), ["foo", "foo/bar", "foo/bar/baz"]);
    }

    #[test]
    fn test_path_prefixes_absolute() {
        assert_eq!(path_prefixes("/a/b"), ["/a", "/a/b"]);
        assert_eq!(path_prefixes("/"), ["/"]);
        assert!(path_prefixes("").is_empty());
    }

    #[test]
    fn test_item_derives_parent_path() {
        let item = ContentItem::new("n1", "r1", "acme:page", "root/n1", "live");
        assert_eq!(item.parent_path.as_deref(), Some("root"));
    }

    #[test]
    fn test_context_roundtrip() {
        let item = ContentItem::new("n1", "r1", "acme:page", "root/n1", "live");
        let ctx = item.context();
        assert_eq!(ctx.workspace, "live");
        assert_eq!(ctx.dimension_hash(), item.dimension_hash());
    }
}
