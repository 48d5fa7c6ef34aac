//! Shared fixtures: an in-memory content repository, a stub extraction-rule
//! evaluator, and node-type helpers.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use content_search::extraction::{extract_html_tags, EvaluationContext, RuleEvaluator};
use content_search::{
    AccessMode, ContentContext, ContentItem, ContentRepository, EvaluationError,
    NodeTypeDefinition, NodeTypeRegistry, PropertySearchSettings, RepositoryError,
};

/// In-memory content tree for driving the indexer and mapping query hits.
pub struct FixtureRepository {
    workspaces: Vec<String>,
    items: Mutex<Vec<ContentItem>>,
}

impl FixtureRepository {
    pub fn new(workspaces: &[&str]) -> Self {
        Self {
            workspaces: workspaces.iter().map(|w| w.to_string()).collect(),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, item: ContentItem) {
        self.items.lock().unwrap().push(item);
    }

    /// Drop every observation of an aggregate, to simulate index staleness.
    pub fn remove(&self, aggregate_id: &str) {
        self.items
            .lock()
            .unwrap()
            .retain(|i| i.aggregate_id != aggregate_id);
    }

    fn in_context<'a>(item: &'a ContentItem, context: &ContentContext) -> bool {
        item.workspace == context.workspace && item.dimensions == context.dimensions
    }
}

#[async_trait]
impl ContentRepository for FixtureRepository {
    async fn find_by_aggregate_id(
        &self,
        aggregate_id: &str,
        context: &ContentContext,
        _access: AccessMode,
    ) -> Result<Option<ContentItem>, RepositoryError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.aggregate_id == aggregate_id && Self::in_context(i, context))
            .cloned())
    }

    async fn workspaces(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.workspaces.clone())
    }

    async fn parent_of(&self, item: &ContentItem) -> Result<Option<ContentItem>, RepositoryError> {
        let Some(parent_path) = &item.parent_path else {
            return Ok(None);
        };
        let context = item.context();
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| &i.path == parent_path && Self::in_context(i, &context))
            .cloned())
    }

    async fn root(&self, context: &ContentContext) -> Result<Option<ContentItem>, RepositoryError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.parent_path.is_none() && Self::in_context(i, context))
            .cloned())
    }

    async fn descendants_of(
        &self,
        root: &ContentItem,
    ) -> Result<Vec<ContentItem>, RepositoryError> {
        let prefix = format!("{}/", root.path);
        let context = root.context();
        let mut descendants: Vec<ContentItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.path.starts_with(&prefix) && Self::in_context(i, &context))
            .cloned()
            .collect();
        // Parents before children, then stable by path.
        descendants.sort_by_key(|i| (i.path.matches('/').count(), i.path.clone()));
        Ok(descendants)
    }
}

/// Minimal expression evaluator: enough surface to exercise the extraction
/// seam without a real expression language.
pub struct StubEvaluator;

impl RuleEvaluator for StubEvaluator {
    fn validate(&self, expression: &str) -> Result<(), EvaluationError> {
        if expression == "malformed" {
            return Err(EvaluationError::new(expression, "parse error"));
        }
        Ok(())
    }

    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext<'_>,
    ) -> Result<Value, EvaluationError> {
        match expression {
            "value" => Ok(context.property_value.cloned().unwrap_or(Value::Null)),
            "htmlTags" => {
                let markup = context
                    .property_value
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                serde_json::to_value(extract_html_tags(markup))
                    .map_err(|e| EvaluationError::new(expression, e.to_string()))
            }
            "explode" => Err(EvaluationError::new(expression, "evaluation blew up")),
            other => Err(EvaluationError::new(other, "unknown expression")),
        }
    }
}

/// Node type with plain-text fulltext routing for a `title` property.
pub fn titled_type(supertypes: &[&str], fulltext_root: bool) -> NodeTypeDefinition {
    NodeTypeDefinition {
        supertypes: supertypes.iter().map(|s| s.to_string()).collect(),
        indexable: true,
        fulltext_root,
        properties: BTreeMap::from([(
            "title".to_string(),
            PropertySearchSettings {
                fulltext_bucket: Some("h1".to_string()),
                ..Default::default()
            },
        )]),
    }
}

/// Node type whose `body` property is indexed verbatim and bucketed through
/// the heading extractor.
pub fn body_type(supertypes: &[&str]) -> NodeTypeDefinition {
    NodeTypeDefinition {
        supertypes: supertypes.iter().map(|s| s.to_string()).collect(),
        indexable: true,
        fulltext_root: false,
        properties: BTreeMap::from([(
            "body".to_string(),
            PropertySearchSettings {
                indexing: Some("value".to_string()),
                fulltext_extractor: Some("htmlTags".to_string()),
                ..Default::default()
            },
        )]),
    }
}

/// Registry used by most fixtures:
/// `site` (fulltext root) ← `page` ← `landing-page`, a `text` content type,
/// an unrelated `widget`, and a `hidden` type excluded from indexing.
pub fn fixture_registry() -> NodeTypeRegistry {
    let mut types = BTreeMap::new();
    types.insert("acme:site".to_string(), titled_type(&[], false));
    types.insert("acme:page".to_string(), titled_type(&[], true));
    types.insert(
        "acme:landing-page".to_string(),
        titled_type(&["acme:page"], true),
    );
    types.insert("acme:text".to_string(), body_type(&[]));
    types.insert("acme:widget".to_string(), titled_type(&[], false));
    types.insert(
        "acme:hidden".to_string(),
        NodeTypeDefinition {
            indexable: false,
            ..titled_type(&[], false)
        },
    );
    NodeTypeRegistry::new(types)
}
