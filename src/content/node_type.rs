// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Node type metadata: supertype hierarchy and per-type search settings.
//!
//! The registry is loaded from configuration and answers the three questions
//! the indexing pipeline asks about a type: is it indexable at all, is it a
//! fulltext aggregation root, and what is its full supertype closure. The
//! closure is expanded once at index time into the `__typeAndSuperTypes`
//! token set, which is what makes type filtering inheritance-aware without a
//! hierarchy join at query time.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Search settings for one property of a node type.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PropertySearchSettings {
    /// Extraction-rule expression producing the stored column value.
    /// `None` stores the raw property value.
    #[serde(default)]
    pub indexing: Option<String>,
    /// Extraction-rule expression producing fulltext buckets from the value.
    #[serde(default)]
    pub fulltext_extractor: Option<String>,
    /// Plain bucket routing when no extractor is configured: the flattened
    /// value is appended to this bucket (`text`, `h1`, ...).
    #[serde(default)]
    pub fulltext_bucket: Option<String>,
}

/// One node type's declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeTypeDefinition {
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Types can opt out of the index entirely; skipping them is a no-op,
    /// not an error.
    #[serde(default = "default_indexable")]
    pub indexable: bool,
    /// Fulltext from descendants is aggregated onto the nearest ancestor of
    /// a root-flagged type.
    #[serde(default)]
    pub fulltext_root: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySearchSettings>,
}

fn default_indexable() -> bool {
    true
}

impl Default for NodeTypeDefinition {
    fn default() -> Self {
        Self {
            supertypes: Vec::new(),
            indexable: true,
            fulltext_root: false,
            properties: BTreeMap::new(),
        }
    }
}

/// Registry of all declared node types.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeTypeRegistry {
    #[serde(flatten)]
    types: BTreeMap<String, NodeTypeDefinition>,
}

impl NodeTypeRegistry {
    pub fn new(types: BTreeMap<String, NodeTypeDefinition>) -> Self {
        Self { types }
    }

    pub fn get(&self, type_name: &str) -> Option<&NodeTypeDefinition> {
        self.types.get(type_name)
    }

    /// Undeclared types are indexable; opting out requires a declaration.
    pub fn is_indexable(&self, type_name: &str) -> bool {
        self.types.get(type_name).map_or(true, |t| t.indexable)
    }

    pub fn is_fulltext_root(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .map_or(false, |t| t.fulltext_root)
    }

    /// The type itself plus the transitive closure of its supertypes, the
    /// type's own name first. A visited guard makes declaration cycles
    /// terminate instead of recursing forever.
    pub fn type_and_supertypes(&self, type_name: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut pending = vec![type_name.to_string()];

        while let Some(name) = pending.pop() {
            if names.iter().any(|n| n == &name) {
                continue;
            }
            if let Some(definition) = self.types.get(&name) {
                for supertype in definition.supertypes.iter().rev() {
                    pending.push(supertype.clone());
                }
            }
            names.push(name);
        }

        names
    }

    /// Effective property settings for a type: own declarations merged over
    /// inherited ones, the most specific declaration winning.
    pub fn effective_properties(
        &self,
        type_name: &str,
    ) -> BTreeMap<String, PropertySearchSettings> {
        let mut merged = BTreeMap::new();
        for name in self.type_and_supertypes(type_name) {
            if let Some(definition) = self.types.get(&name) {
                for (property, settings) in &definition.properties {
                    merged
                        .entry(property.clone())
                        .or_insert_with(|| settings.clone());
                }
            }
        }
        merged
    }

    /// All type names flagged as fulltext aggregation roots.
    pub fn fulltext_root_types(&self) -> Vec<String> {
        self.types
            .iter()
            .filter(|(_, t)| t.fulltext_root)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every configured extraction expression, with its declaring type and
    /// property, for startup validation.
    pub fn configured_expressions(&self) -> Vec<(String, String, String)> {
        let mut expressions = Vec::new();
        for (type_name, definition) in &self.types {
            for (property, settings) in &definition.properties {
                for expression in [&settings.indexing, &settings.fulltext_extractor]
                    .into_iter()
                    .flatten()
                {
                    expressions.push((type_name.clone(), property.clone(), expression.clone()));
                }
            }
        }
        expressions
    }
}
