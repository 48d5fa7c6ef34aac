// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the embedding
//! application chooses the exporter.
//!
//! # Metric Naming Convention
//! - `content_search_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms

use metrics::{counter, histogram};
use std::time::Duration;

/// Record one indexed item.
pub fn record_indexed(workspace: &str) {
    counter!(
        "content_search_indexed_total",
        "workspace" => workspace.to_string()
    )
    .increment(1);
}

/// Record a dedup-merge of an already-seen identifier into its row.
pub fn record_merged(workspace: &str) {
    counter!(
        "content_search_merged_total",
        "workspace" => workspace.to_string()
    )
    .increment(1);
}

/// Record a removed index row.
pub fn record_removed() {
    counter!("content_search_removed_total").increment(1);
}

/// Record a per-item indexing failure (skipped by the pass driver).
pub fn record_index_error() {
    counter!("content_search_index_errors_total").increment(1);
}

/// Record an executed structured query.
pub fn record_query(backend: &str, operation: &str) {
    counter!(
        "content_search_queries_total",
        "backend" => backend.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record structured query latency.
pub fn record_query_latency(backend: &str, duration: Duration) {
    histogram!(
        "content_search_query_seconds",
        "backend" => backend.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a result row dropped because it no longer resolves to a live item.
pub fn record_stale_dropped() {
    counter!("content_search_stale_results_total").increment(1);
}
