//! Splitting text output on a separator

use proptest::prelude::*;
use shortgen::pipeline::parse::split_output;

fn piece() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?]{0,24}"
}

proptest! {
    #[test]
    fn pieces_are_trimmed_and_non_empty(
        parts in prop::collection::vec(piece(), 0..8),
        separator in "(---|===IMAGE===|\\|)",
    ) {
        let raw = parts.join(&separator);
        let split = split_output(&raw, Some(&separator));

        for element in &split {
            prop_assert!(!element.is_empty());
            prop_assert_eq!(element.trim(), element.as_str());
            prop_assert!(!element.contains(separator.as_str()));
        }
    }

    #[test]
    fn splitting_recovers_the_non_blank_parts(
        parts in prop::collection::vec(piece(), 0..8),
        separator in "(---|===IMAGE===|\\|)",
    ) {
        let raw = parts.join(&separator);
        let expected: Vec<String> = parts
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        prop_assert_eq!(split_output(&raw, Some(&separator)), expected);
    }

    #[test]
    fn no_separator_yields_one_trimmed_element(raw in "[ a-z\\n]{0,40}") {
        for separator in [None, Some("")] {
            let split = split_output(&raw, separator);
            prop_assert_eq!(split, vec![raw.trim().to_string()]);
        }
    }
}
