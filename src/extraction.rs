// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Property and fulltext extraction.
//!
//! Turns one [`ContentItem`] observation into the flat column map and the
//! fulltext buckets of its index row. The built-in columns (identifier,
//! path, token sets) are computed here; everything else is driven by the
//! per-property search settings on the item's node type, evaluated through
//! the external [`RuleEvaluator`] seam.
//!
//! Fulltext is bucketed: heading levels `h1`..`h6` and a residual `text`
//! bucket, so queries can weight headings without a markup-aware store.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::content::{path_prefixes, ContentItem, NodeTypeRegistry};
use crate::error::{EvaluationError, IndexError};
use crate::store::{FulltextBuckets, IndexProperties};
use crate::tokenset;

/// Context handed to an extraction rule for one property.
pub struct EvaluationContext<'a> {
    pub item: &'a ContentItem,
    pub property_name: &'a str,
    pub property_value: Option<&'a Value>,
    pub identifier: &'a str,
}

/// External expression evaluator for configured extraction rules.
///
/// The expression language is opaque to this crate; only the evaluation
/// contract matters. `validate` lets the pass driver reject malformed
/// configuration at startup instead of failing mid-pass.
pub trait RuleEvaluator: Send + Sync {
    fn validate(&self, expression: &str) -> Result<(), EvaluationError>;

    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext<'_>,
    ) -> Result<Value, EvaluationError>;
}

/// Flatten a structured value into the string stored in its column.
///
/// Scalars keep their plain form; arrays and objects are serialized to JSON.
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Route a string into a single named bucket.
pub fn extract_into(bucket: &str, value: &str) -> FulltextBuckets {
    FulltextBuckets::from([(bucket.to_string(), value.to_string())])
}

/// Split markup into heading buckets plus a residual `text` bucket.
///
/// `<h1>Title</h1><p>Body</p>` yields `h1: "Title"` and `text: "Body"`.
/// All tags are stripped from the output and whitespace is collapsed.
pub fn extract_html_tags(markup: &str) -> FulltextBuckets {
    // Space out brackets so stripping tags cannot concatenate words.
    let spaced = markup.replace('<', " <").replace('>', "> ");
    let stripped = strip_tags_except_headings(&spaced);

    let mut raw: BTreeMap<String, String> = BTreeMap::new();
    let mut text = String::new();
    let mut rest = stripped.as_str();

    while let Some(heading) = find_heading(rest) {
        text.push_str(&rest[..heading.start]);
        let bucket = raw.entry(format!("h{}", heading.level)).or_default();
        bucket.push(' ');
        bucket.push_str(&rest[heading.content_start..heading.content_end]);
        rest = &rest[heading.end..];
    }
    text.push_str(rest);
    raw.insert("text".to_string(), text);

    raw.into_iter()
        .filter_map(|(bucket, content)| {
            let collapsed = collapse_whitespace(&strip_all_tags(&content));
            (!collapsed.is_empty()).then_some((bucket, collapsed))
        })
        .collect()
}

struct HeadingMatch {
    start: usize,
    content_start: usize,
    content_end: usize,
    end: usize,
    level: u8,
}

/// Locate the next complete `<hN ...>...</hN>` element.
fn find_heading(s: &str) -> Option<HeadingMatch> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i + 3 < bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1].eq_ignore_ascii_case(&b'h')
            && bytes[i + 2].is_ascii_digit()
            && (b'1'..=b'6').contains(&bytes[i + 2])
            && (bytes[i + 3] == b'>' || bytes[i + 3].is_ascii_whitespace())
        {
            let level = bytes[i + 2] - b'0';
            if let Some(open_end) = s[i..].find('>').map(|p| i + p + 1) {
                let close_tag_lower = format!("</h{}>", level);
                if let Some(close_rel) = s[open_end..].to_ascii_lowercase().find(&close_tag_lower)
                {
                    let close_start = open_end + close_rel;
                    return Some(HeadingMatch {
                        start: i,
                        content_start: open_end,
                        content_end: close_start,
                        end: close_start + close_tag_lower.len(),
                        level,
                    });
                }
            }
            // Unclosed heading: no match, the remainder belongs to `text`.
            return None;
        }
        i += 1;
    }
    None
}

/// Drop every tag except `<hN>` / `</hN>`.
fn strip_tags_except_headings(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            let tag_end = s[i..].find('>').map(|p| i + p + 1).unwrap_or(s.len());
            if is_heading_tag(&s[i..tag_end]) {
                out.push_str(&s[i..tag_end]);
            }
            i = tag_end;
        } else {
            // Byte-accurate is fine: tag delimiters are ASCII, everything
            // between them is copied verbatim.
            let next = s[i..].find('<').map(|p| i + p).unwrap_or(s.len());
            out.push_str(&s[i..next]);
            i = next;
        }
    }
    out
}

fn is_heading_tag(tag: &str) -> bool {
    let inner = tag
        .trim_start_matches('<')
        .trim_start_matches('/')
        .trim_end_matches('>');
    let mut chars = inner.chars();
    matches!(
        (chars.next().map(|c| c.to_ascii_lowercase()), chars.next()),
        (Some('h'), Some('1'..='6'))
    ) && inner[2..]
        .chars()
        .next()
        .map_or(true, |c| c.is_whitespace())
}

fn strip_all_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if s.as_bytes()[i] == b'<' {
            i = s[i..].find('>').map(|p| i + p + 1).unwrap_or(s.len());
        } else {
            let next = s[i..].find('<').map(|p| i + p).unwrap_or(s.len());
            out.push_str(&s[i..next]);
            i = next;
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds the column map and fulltext buckets for one item.
pub struct PropertyExtractor<'a> {
    node_types: &'a NodeTypeRegistry,
    evaluator: &'a dyn RuleEvaluator,
}

impl<'a> PropertyExtractor<'a> {
    pub fn new(node_types: &'a NodeTypeRegistry, evaluator: &'a dyn RuleEvaluator) -> Self {
        Self {
            node_types,
            evaluator,
        }
    }

    /// Validate every configured expression before a pass starts. Malformed
    /// rules are configuration errors and fatal here, not per-item noise.
    pub fn validate_configuration(&self) -> Result<(), EvaluationError> {
        for (type_name, property, expression) in self.node_types.configured_expressions() {
            self.evaluator.validate(&expression).map_err(|e| {
                EvaluationError::new(
                    expression.clone(),
                    format!("{} (declared on {}.{})", e.message, type_name, property),
                )
            })?;
        }
        Ok(())
    }

    /// Extract the stored columns and fulltext of one item.
    pub fn extract(
        &self,
        item: &ContentItem,
        identifier: &str,
    ) -> Result<(IndexProperties, FulltextBuckets), IndexError> {
        let mut properties = self.built_in_columns(item);
        let mut fulltext = FulltextBuckets::new();

        for (name, settings) in self.node_types.effective_properties(&item.type_name) {
            let raw = item.properties.get(&name);
            let context = EvaluationContext {
                item,
                property_name: &name,
                property_value: raw,
                identifier,
            };

            let stored = match &settings.indexing {
                Some(expression) => {
                    let value = self
                        .evaluator
                        .evaluate(expression, &context)
                        .map_err(|e| IndexError::Extraction {
                            identifier: identifier.to_string(),
                            message: e.to_string(),
                        })?;
                    (!value.is_null()).then(|| flatten_value(&value))
                }
                None => raw.map(flatten_value),
            };
            if let Some(stored) = stored {
                properties.insert(name.clone(), stored);
            }

            if let Some(expression) = &settings.fulltext_extractor {
                let value = self
                    .evaluator
                    .evaluate(expression, &context)
                    .map_err(|e| IndexError::Extraction {
                        identifier: identifier.to_string(),
                        message: e.to_string(),
                    })?;
                merge_buckets(&mut fulltext, buckets_from_value(&value));
            } else if let Some(bucket) = &settings.fulltext_bucket {
                if let Some(raw) = raw {
                    let flat = flatten_value(raw);
                    if !flat.is_empty() {
                        merge_buckets(&mut fulltext, extract_into(bucket, &flat));
                    }
                }
            }
        }

        debug!(
            identifier = %identifier,
            columns = properties.len(),
            buckets = fulltext.len(),
            "Extracted item"
        );

        Ok((properties, fulltext))
    }

    fn built_in_columns(&self, item: &ContentItem) -> IndexProperties {
        let parent_prefixes = item
            .parent_path
            .as_deref()
            .map(path_prefixes)
            .unwrap_or_default();

        IndexProperties::from([
            (
                "__identifier".to_string(),
                item.aggregate_id.clone(),
            ),
            ("__path".to_string(), item.path.clone()),
            (
                "__parentPath".to_string(),
                tokenset::encode(&parent_prefixes),
            ),
            (
                "__workspace".to_string(),
                tokenset::encode([item.workspace.as_str()]),
            ),
            (
                "__dimensionshash".to_string(),
                tokenset::encode([item.dimension_hash().as_str()]),
            ),
            (
                "__typeAndSuperTypes".to_string(),
                tokenset::encode(&self.node_types.type_and_supertypes(&item.type_name)),
            ),
        ])
    }
}

/// Interpret an evaluated fulltext value: an object maps buckets to text, a
/// plain string lands in `text`.
fn buckets_from_value(value: &Value) -> FulltextBuckets {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(bucket, v)| {
                let flat = flatten_value(v);
                (!flat.is_empty()).then(|| (bucket.clone(), flat))
            })
            .collect(),
        Value::Null => FulltextBuckets::new(),
        other => {
            let flat = flatten_value(other);
            if flat.is_empty() {
                FulltextBuckets::new()
            } else {
                extract_into("text", &flat)
            }
        }
    }
}

fn merge_buckets(target: &mut FulltextBuckets, source: FulltextBuckets) {
    for (bucket, text) in source {
        match target.get_mut(&bucket) {
            Some(existing) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(&text);
            }
            _ => {
                target.insert(bucket, text);
            }
        }
    }
}
