//! Index-row key derivation.
//!
//! The row key is derived from the item's backing record, not from its tree
//! path: moving a node does not orphan its row, and two observations that
//! fall through to the same record (an unmodified node seen from two
//! workspaces) resolve to the same key, which is what lets the dedup cache
//! merge them into one row instead of duplicating it.

use sha2::{Digest, Sha256};

use crate::content::ContentItem;

/// Stable index-row key for one content item observation.
pub fn resolve(item: &ContentItem) -> String {
    hex::encode(Sha256::digest(item.record_id.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_record_same_key_across_workspaces() {
        let live = ContentItem::new("n1", "record-1", "acme:page", "root/n1", "live");
        let draft = ContentItem::new("n1", "record-1", "acme:page", "root/n1", "draft");
        assert_eq!(resolve(&live), resolve(&draft));
    }

    #[test]
    fn test_distinct_records_distinct_keys() {
        let base = ContentItem::new("n1", "record-1", "acme:page", "root/n1", "live");
        let variant = ContentItem::new("n1", "record-2", "acme:page", "root/n1", "draft");
        assert_ne!(resolve(&base), resolve(&variant));
    }

    #[test]
    fn test_key_independent_of_path() {
        let before = ContentItem::new("n1", "record-1", "acme:page", "root/a/n1", "live");
        let after = ContentItem::new("n1", "record-1", "acme:page", "root/b/n1", "live");
        assert_eq!(resolve(&before), resolve(&after));
    }
}
