//! Single-pass placeholder substitution

use proptest::prelude::*;
use shortgen::pipeline::prompt::{resolve_prompt, PromptContext};

/// Template fragment: either literal text without braces or a known placeholder
#[derive(Debug, Clone)]
enum Fragment {
    Literal(String),
    Parent,
    Root,
    SceneNum,
    Indexed(usize),
}

fn fragment() -> impl Strategy<Value = Fragment> {
    prop_oneof![
        "[a-zA-Z0-9 :\\n]{0,12}".prop_map(Fragment::Literal),
        Just(Fragment::Parent),
        Just(Fragment::Root),
        Just(Fragment::SceneNum),
        (0usize..4).prop_map(Fragment::Indexed),
    ]
}

/// Arbitrary inserted text, braces and placeholder names included
fn value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z {}\\[\\]]{0,16}",
        Just("{root}".to_string()),
        Just("{parent}".to_string()),
        Just("{sceneNum} {".to_string()),
    ]
}

proptest! {
    #[test]
    fn resolution_matches_fragment_by_fragment_expansion(
        fragments in prop::collection::vec(fragment(), 0..10),
        outputs in prop::collection::vec(value(), 1..4),
        index in 0usize..4,
        root in value(),
    ) {
        let ctx = PromptContext {
            parent_output: &outputs,
            parent_index: index,
            root_input: Some(root.as_str()),
        };

        let mut template = String::new();
        let mut expected = String::new();
        for fragment in &fragments {
            match fragment {
                Fragment::Literal(text) => {
                    template.push_str(text);
                    expected.push_str(text);
                }
                Fragment::Parent => {
                    template.push_str("{parent}");
                    expected.push_str(ctx.parent_slot());
                }
                Fragment::Root => {
                    template.push_str("{root}");
                    expected.push_str(&root);
                }
                Fragment::SceneNum => {
                    template.push_str("{sceneNum}");
                    expected.push_str(&(index + 1).to_string());
                }
                Fragment::Indexed(i) => {
                    template.push_str(&format!("{{parent[{}]}}", i));
                    expected.push_str(outputs.get(*i).map(String::as_str).unwrap_or(""));
                }
            }
        }

        prop_assert_eq!(resolve_prompt(&template, &ctx), expected);
    }

    #[test]
    fn brace_free_templates_are_unchanged(template in "[^{}]{0,64}") {
        let outputs = vec!["value".to_string()];
        let ctx = PromptContext {
            parent_output: &outputs,
            parent_index: 0,
            root_input: None,
        };
        prop_assert_eq!(resolve_prompt(&template, &ctx), template);
    }
}
