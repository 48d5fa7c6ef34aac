//! Structured query engine tests against a real SQLite index.
//!
//! Indexes a small fixture tree, then exercises scoping, the
//! inheritance-aware type filter, property predicates, sorting, pagination,
//! fulltext matching at root granularity, and stale-row dropping.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{fixture_registry, FixtureRepository, StubEvaluator};
use content_search::{
    ContentItem, IndexingPass, SearchConfig, SearchQueryBuilder, SqlIndexStore,
};

struct Fixture {
    store: Arc<SqlIndexStore>,
    repository: Arc<FixtureRepository>,
    site: ContentItem,
}

async fn build_fixture(dir: &tempfile::TempDir, name: &str) -> Fixture {
    let path = dir.path().join(format!("{}.db", name));
    let config = SearchConfig {
        sql_url: Some(format!("sqlite://{}?mode=rwc", path.display())),
        node_types: fixture_registry(),
        ..Default::default()
    };
    let store = Arc::new(config.connect_store().await.unwrap());
    let repository = Arc::new(FixtureRepository::new(&["live", "draft"]));

    let site = ContentItem::new("s1", "rec-s1", "acme:site", "root", "live");
    let p1 = ContentItem::new("p1", "rec-p1", "acme:page", "root/p1", "live")
        .with_property("title", json!("Alpha"));
    let p2 = ContentItem::new("p2", "rec-p2", "acme:landing-page", "root/p2", "live")
        .with_property("title", json!("Beta"));
    let widget = ContentItem::new("w1", "rec-w1", "acme:widget", "root/w1", "live")
        .with_property("title", json!("Gamma"));
    let fragment = ContentItem::new("t1", "rec-t1", "acme:text", "root/p1/t1", "live")
        .with_property("body", json!("<p>unique haystack</p>"));
    let other_site = ContentItem::new("s2", "rec-s2", "acme:site", "other", "live");
    let other_page = ContentItem::new("p3", "rec-p3", "acme:page", "other/p3", "live")
        .with_property("title", json!("Delta"));
    let draft_page = ContentItem::new("p9", "rec-p9", "acme:page", "root/p9", "draft")
        .with_property("title", json!("DraftOnly"));

    let items = [
        &site,
        &p1,
        &p2,
        &widget,
        &fragment,
        &other_site,
        &other_page,
        &draft_page,
    ];
    for item in items {
        repository.add((*item).clone());
    }

    let indexer = config.node_indexer(&store, repository.clone(), Arc::new(StubEvaluator));
    let mut pass = IndexingPass::new();
    for item in items {
        indexer.index_item(&mut pass, item, None, false).await.unwrap();
    }

    Fixture {
        store,
        repository,
        site,
    }
}

impl Fixture {
    fn query(&self) -> SearchQueryBuilder {
        SearchQueryBuilder::new(
            self.store.grammar(),
            self.store.clone(),
            self.repository.clone(),
        )
    }
}

fn aggregate_ids(items: &[ContentItem]) -> Vec<&str> {
    items.iter().map(|i| i.aggregate_id.as_str()).collect()
}

#[tokio::test]
async fn type_filter_includes_subtypes_and_excludes_unrelated() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "types").await;

    let hits = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .execute()
        .await
        .unwrap();

    // `acme:landing-page` inherits from `acme:page`; the widget and the
    // text fragment do not.
    assert_eq!(aggregate_ids(&hits), ["p1", "p2"]);
}

#[tokio::test]
async fn scope_limits_to_subtree_workspace_and_variant() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "scope").await;

    let hits = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .execute()
        .await
        .unwrap();

    // `p3` lives under the other site; `p9` only exists in the draft
    // workspace. Neither may leak into this scope.
    assert!(!aggregate_ids(&hits).contains(&"p3"));
    assert!(!aggregate_ids(&hits).contains(&"p9"));
}

#[tokio::test]
async fn exact_match_and_like_predicates() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "predicates").await;

    let exact = fixture
        .query()
        .scope_to(&fixture.site)
        .exact_match("title", "Alpha")
        .execute()
        .await
        .unwrap();
    assert_eq!(aggregate_ids(&exact), ["p1"]);

    let like = fixture
        .query()
        .scope_to(&fixture.site)
        .like("title", "et")
        .execute()
        .await
        .unwrap();
    assert_eq!(aggregate_ids(&like), ["p2"]);
}

#[tokio::test]
async fn range_predicates_compare_stored_text() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "ranges").await;

    let hits = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .greater_than("title", "Alpha")
        .execute()
        .await
        .unwrap();
    assert_eq!(aggregate_ids(&hits), ["p2"]);

    let hits = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .greater_than_or_equal("title", "Alpha")
        .less_than("title", "Beta")
        .execute()
        .await
        .unwrap();
    assert_eq!(aggregate_ids(&hits), ["p1"]);
}

#[tokio::test]
async fn count_matches_execute_length() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "count").await;

    let count = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .count()
        .await
        .unwrap();
    let hits = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .execute()
        .await
        .unwrap();

    assert_eq!(count as usize, hits.len());
}

#[tokio::test]
async fn sorting_with_insertion_order_tiebreak() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "sorting").await;

    let descending = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .sort_desc("title")
        .execute()
        .await
        .unwrap();
    assert_eq!(aggregate_ids(&descending), ["p2", "p1"]);

    // Equal sort keys fall back to insertion order, so the result is stable.
    let tied = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .sort_asc("__workspace")
        .execute()
        .await
        .unwrap();
    assert_eq!(aggregate_ids(&tied), ["p1", "p2"]);
}

#[tokio::test]
async fn pagination_with_limit_and_from() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "paging").await;

    let first = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .sort_asc("title")
        .limit(1)
        .execute()
        .await
        .unwrap();
    assert_eq!(aggregate_ids(&first), ["p1"]);

    let second = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:page")
        .sort_asc("title")
        .limit(1)
        .from(1)
        .execute()
        .await
        .unwrap();
    assert_eq!(aggregate_ids(&second), ["p2"]);
}

#[tokio::test]
async fn fulltext_hits_surface_at_page_granularity() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "fulltext").await;

    // The haystack text was authored on the fragment below `p1`, but the
    // hit is reported for the page.
    let hits = fixture
        .query()
        .scope_to(&fixture.site)
        .fulltext("haystack")
        .log("fulltext smoke")
        .execute()
        .await
        .unwrap();

    assert_eq!(aggregate_ids(&hits), ["p1"]);
}

#[tokio::test]
async fn stale_rows_are_dropped_from_execute_but_counted() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = build_fixture(&dir, "stale").await;

    // The tree moved on; the index did not.
    fixture.repository.remove("p2");

    let hits = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:landing-page")
        .execute()
        .await
        .unwrap();
    assert!(hits.is_empty());

    // count() works on rows alone, so the stale entry still counts.
    let count = fixture
        .query()
        .scope_to(&fixture.site)
        .node_type("acme:landing-page")
        .count()
        .await
        .unwrap();
    assert_eq!(count, 1);
}
