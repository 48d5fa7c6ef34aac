// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Content dimension presets and combination enumeration.
//!
//! A dimension axis (e.g. `language`) carries an ordered list of presets,
//! each with a concrete value-set (e.g. `["en_US", "en"]` for a fallback
//! chain). A full index rebuild and the single-item fan-out both have to
//! visit every combination of axis presets, so the calculator turns the
//! configured axes into the list of [`DimensionCombination`]s to index under.
//!
//! The enumeration is a round-robin pairing, not a Cartesian product: every
//! axis walks its preset list cyclically and independently over `N`
//! combination slots, where `N` is the product of the per-axis preset
//! counts. When preset counts share divisors this does not reach every
//! Cartesian combination. Persisted variant hashes and the re-index fan-out
//! are built against this exact enumeration, so it must not be swapped for a
//! product without migrating the stored hashes.

use std::collections::BTreeMap;

use serde::Deserialize;
use sha2::{Digest, Sha256};

/// One selectable preset on a dimension axis.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DimensionPreset {
    /// Value-set this preset resolves to, most specific first.
    pub values: Vec<String>,
}

/// Configuration of a single dimension axis.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DimensionAxis {
    /// Ordered presets; an axis without presets is excluded from indexing.
    #[serde(default)]
    pub presets: Vec<DimensionPreset>,
}

/// All configured axes, keyed by axis name.
///
/// `BTreeMap` keeps axis order stable so combination hashes are
/// deterministic across runs.
pub type DimensionPresets = BTreeMap<String, DimensionAxis>;

/// One concrete (axis → value-set) assignment a tree is indexed under.
pub type DimensionCombination = BTreeMap<String, Vec<String>>;

/// Enumerate the combinations that must be indexed separately.
///
/// Returns an empty list when no axis defines presets; callers treat that as
/// the single "no dimensions" context.
pub fn calculate_combinations(presets: &DimensionPresets) -> Vec<DimensionCombination> {
    let mut combination_count: usize = 1;
    let mut any_presets = false;

    for axis in presets.values() {
        if !axis.presets.is_empty() {
            combination_count *= axis.presets.len();
            any_presets = true;
        }
    }

    if !any_presets {
        return Vec::new();
    }

    let mut combinations: Vec<DimensionCombination> =
        vec![DimensionCombination::new(); combination_count];

    for (axis_name, axis) in presets {
        if axis.presets.is_empty() {
            continue;
        }
        // Cyclic cursor: advance once per combination slot, wrapping to the
        // first preset after the last, independent of the other axes.
        let mut cursor = axis.presets.iter().cycle();
        for combination in combinations.iter_mut() {
            let preset = cursor.next().expect("cycle over non-empty presets");
            combination.insert(axis_name.clone(), preset.values.clone());
        }
    }

    combinations
}

/// Hash identifying one dimension combination inside `__dimensionshash`.
///
/// Canonical JSON of the (ordered) combination, sha256, hex. The empty
/// combination hashes too, so rows indexed without dimensions still carry a
/// matchable token.
pub fn combination_hash(combination: &DimensionCombination) -> String {
    let canonical =
        serde_json::to_string(combination).expect("string map serialization cannot fail");
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(value_sets: &[&[&str]]) -> DimensionAxis {
        DimensionAxis {
            presets: value_sets
                .iter()
                .map(|values| DimensionPreset {
                    values: values.iter().map(|v| v.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_no_axes_yields_no_combinations() {
        assert!(calculate_combinations(&DimensionPresets::new()).is_empty());
    }

    #[test]
    fn test_axis_without_presets_is_excluded() {
        let mut presets = DimensionPresets::new();
        presets.insert("language".into(), axis(&[&["en"], &["de"]]));
        presets.insert("region".into(), DimensionAxis::default());

        let combinations = calculate_combinations(&presets);
        assert_eq!(combinations.len(), 2);
        assert!(combinations.iter().all(|c| !c.contains_key("region")));
    }

    #[test]
    fn test_cyclic_assignment_two_by_three() {
        let mut presets = DimensionPresets::new();
        presets.insert("lang".into(), axis(&[&["en"], &["de"]]));
        presets.insert("region".into(), axis(&[&["us"], &["eu"], &["asia"]]));

        let combinations = calculate_combinations(&presets);
        assert_eq!(combinations.len(), 6);

        let langs: Vec<&str> = combinations.iter().map(|c| c["lang"][0].as_str()).collect();
        let regions: Vec<&str> = combinations
            .iter()
            .map(|c| c["region"][0].as_str())
            .collect();

        // Each axis cycles independently; this is the documented pairing,
        // not a sorted Cartesian product.
        assert_eq!(langs, ["en", "de", "en", "de", "en", "de"]);
        assert_eq!(regions, ["us", "eu", "asia", "us", "eu", "asia"]);
    }

    #[test]
    fn test_equal_counts_do_not_produce_full_product() {
        let mut presets = DimensionPresets::new();
        presets.insert("a".into(), axis(&[&["a1"], &["a2"]]));
        presets.insert("b".into(), axis(&[&["b1"], &["b2"]]));

        let combinations = calculate_combinations(&presets);
        assert_eq!(combinations.len(), 4);

        // Both axes advance in lockstep, so (a1, b2) never appears.
        assert!(!combinations
            .iter()
            .any(|c| c["a"][0] == "a1" && c["b"][0] == "b2"));
    }

    #[test]
    fn test_preset_value_sets_carried_whole() {
        let mut presets = DimensionPresets::new();
        presets.insert("language".into(), axis(&[&["en_US", "en"]]));

        let combinations = calculate_combinations(&presets);
        assert_eq!(combinations[0]["language"], vec!["en_US", "en"]);
    }

    #[test]
    fn test_combination_hash_is_stable_and_distinct() {
        let mut a = DimensionCombination::new();
        a.insert("language".into(), vec!["en".into()]);
        let mut b = DimensionCombination::new();
        b.insert("language".into(), vec!["de".into()]);

        assert_eq!(combination_hash(&a), combination_hash(&a));
        assert_ne!(combination_hash(&a), combination_hash(&b));
        assert_eq!(combination_hash(&a).len(), 64);
    }
}
