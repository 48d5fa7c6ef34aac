//! Property tests for the token-set codec and the combination calculator.

use proptest::prelude::*;

use content_search::dimensions::{
    calculate_combinations, DimensionAxis, DimensionPreset, DimensionPresets,
};
use content_search::tokenset;

proptest! {
    #[test]
    fn encoded_sets_contain_their_members(
        values in prop::collection::vec("[a-z0-9-]{1,12}", 1..8)
    ) {
        let encoded = tokenset::encode(&values);
        for value in &values {
            prop_assert!(tokenset::contains(&encoded, value));
        }
    }

    #[test]
    fn append_preserves_existing_members(
        values in prop::collection::vec("[a-z0-9-]{1,12}", 1..6),
        extra in "[a-z0-9-]{1,12}"
    ) {
        let mut encoded = tokenset::encode(&values);
        encoded = tokenset::append(&encoded, &extra);

        prop_assert!(tokenset::contains(&encoded, &extra));
        for value in &values {
            prop_assert!(tokenset::contains(&encoded, value));
        }
    }

    #[test]
    fn like_pattern_wraps_the_token(value in "[a-z0-9-]{1,12}") {
        let pattern = tokenset::like_pattern(&value);
        prop_assert!(pattern.starts_with('%'));
        prop_assert!(pattern.ends_with('%'));
        prop_assert!(
            pattern.contains(&format!("#{}#", value)),
            "pattern should contain the delimited token"
        );
    }

    #[test]
    fn combination_count_is_product_of_preset_counts(
        counts in prop::collection::vec(1usize..4, 1..4)
    ) {
        let mut presets = DimensionPresets::new();
        for (axis_index, count) in counts.iter().enumerate() {
            presets.insert(
                format!("axis{}", axis_index),
                DimensionAxis {
                    presets: (0..*count)
                        .map(|i| DimensionPreset {
                            values: vec![format!("v{}", i)],
                        })
                        .collect(),
                },
            );
        }

        let combinations = calculate_combinations(&presets);
        let expected: usize = counts.iter().product();
        prop_assert_eq!(combinations.len(), expected);

        for combination in &combinations {
            prop_assert_eq!(combination.len(), counts.len());
        }
    }
}
