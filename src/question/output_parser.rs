//! Locate the JSON object in generated text
//!
//! Backends are asked for bare JSON but often wrap it in markdown fences or
//! a sentence of prose.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("code fence pattern is valid")
});

/// Unclosed `{` positions scanned before giving up on embedded JSON
const MAX_UNBALANCED_STARTS: usize = 8;

/// Extract a JSON object from text
///
/// Tries, in order: the whole text, each fenced code block, then the first
/// balanced `{...}` span.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(json @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(json);
    }

    for captures in CODE_FENCE.captures_iter(trimmed) {
        if let Ok(json @ Value::Object(_)) = serde_json::from_str::<Value>(captures[1].trim()) {
            return Some(json);
        }
    }

    let mut search_from = 0;
    let mut unbalanced = 0;
    while let Some(offset) = trimmed[search_from..].find('{') {
        let start = search_from + offset;
        match balanced_object_end(&trimmed[start..]) {
            Some(end) => {
                if let Ok(json) = serde_json::from_str::<Value>(&trimmed[start..start + end]) {
                    return Some(json);
                }
                // Nothing nested in a rejected span is tried again
                search_from = start + end;
            }
            None => {
                unbalanced += 1;
                if unbalanced >= MAX_UNBALANCED_STARTS {
                    return None;
                }
                search_from = start + 1;
            }
        }
    }

    None
}

/// Byte length of the balanced object starting at `text[0] == '{'`
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}
