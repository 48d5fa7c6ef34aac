//! Content model: item snapshots, type metadata, and the repository seam.

mod item;
mod node_type;
mod repository;

pub use item::{parent_of_path, path_prefixes, ContentContext, ContentItem};
pub use node_type::{NodeTypeDefinition, NodeTypeRegistry, PropertySearchSettings};
pub use repository::{AccessMode, ContentRepository, RepositoryError};
