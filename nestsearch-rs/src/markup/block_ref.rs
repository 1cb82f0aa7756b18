//! Block reference parsing (`((block-uid))`).

use crate::markup::code::{find_code_spans, is_in_code_span};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static BLOCK_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\(([a-zA-Z0-9_-]+)\)\)").unwrap());

/// Unique block ids referenced from block text, in order of first appearance.
pub fn parse_block_refs(content: &str) -> Vec<String> {
    let code_spans = find_code_spans(content);
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for cap in BLOCK_REF.captures_iter(content) {
        let full = cap.get(0).unwrap();
        if is_in_code_span(full.start(), &code_spans) {
            continue;
        }
        let id = cap.get(1).unwrap().as_str();
        if seen.insert(id) {
            ids.push(id.to_string());
        }
    }

    ids
}

/// If `text` is exactly one block reference, return the referenced id.
pub fn as_block_ref(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("((")?.strip_suffix("))")?;
    if !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Some(inner)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block_refs() {
        let ids = parse_block_refs("see ((abc123XYZ)) and ((q-9_z)) and ((abc123XYZ))");
        assert_eq!(ids, vec!["abc123XYZ".to_string(), "q-9_z".to_string()]);
    }

    #[test]
    fn test_skip_code() {
        assert!(parse_block_refs("`((abc))`").is_empty());
    }

    #[test]
    fn test_as_block_ref() {
        assert_eq!(as_block_ref("((abc123))"), Some("abc123"));
        assert_eq!(as_block_ref(" ((a-b)) "), Some("a-b"));
        assert_eq!(as_block_ref("((a b))"), None);
        assert_eq!(as_block_ref("(())"), None);
        assert_eq!(as_block_ref("abc"), None);
    }
}
