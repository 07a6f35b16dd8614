//! Prompt resolution.
//!
//! Templates use literal `{token}` placeholders. Each placeholder in the template is
//! replaced in a single left-to-right scan, so text inserted for one placeholder is
//! never scanned again. Tokens resolve as:
//!
//! | token          | value                                                  |
//! |----------------|--------------------------------------------------------|
//! | `{parent}`     | parent slot (output at the node's index, else first, else empty) |
//! | `{parent[N]}`  | parent's N-th output element, empty if absent          |
//! | `{sceneNum}`   | node's parent output index plus one                    |
//! | `{root}`       | run's initial input, empty if there is none            |
//! | `{input}`, `{parent[i]}` | aliases of `{parent}`                        |
//!
//! Unknown tokens are left untouched.

/// Everything a node's prompt may read: its finalized parent output and the run input.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Parent output array; for roots, the initial input as a single element
    pub parent_output: &'a [String],
    pub parent_index: usize,
    pub root_input: Option<&'a str>,
}

impl<'a> PromptContext<'a> {
    /// Output at the node's index, else the first element, else empty.
    pub fn parent_slot(&self) -> &'a str {
        self.parent_output
            .get(self.parent_index)
            .filter(|value| !value.is_empty())
            .or_else(|| self.parent_output.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    fn resolve_token(&self, token: &str) -> Option<String> {
        match token {
            "parent" | "input" | "parent[i]" => Some(self.parent_slot().to_string()),
            "sceneNum" => Some((self.parent_index + 1).to_string()),
            "root" => Some(self.root_input.unwrap_or("").to_string()),
            _ => {
                let index = token
                    .strip_prefix("parent[")?
                    .strip_suffix(']')?
                    .parse::<usize>()
                    .ok()?;
                Some(self.parent_output.get(index).cloned().unwrap_or_default())
            }
        }
    }
}

/// Resolve every known placeholder in `template`.
pub fn resolve_prompt(template: &str, ctx: &PromptContext<'_>) -> String {
    let mut resolved = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        resolved.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        match ctx.resolve_token(&after[..close]) {
            Some(value) => {
                resolved.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                // Not a placeholder; keep the brace and rescan from the next character.
                resolved.push('{');
                rest = after;
            }
        }
    }

    resolved.push_str(rest);
    resolved
}
