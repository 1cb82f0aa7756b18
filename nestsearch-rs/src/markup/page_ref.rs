//! Page reference parsing: `[[Page]]`, `#[[Page]]`, `#tag` and `Attribute::`.

use crate::markup::code::{find_code_spans, is_in_code_span};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

// Innermost bracket pair only; for `[[a [[b]]]]` this yields `b`.
static PAGE_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").unwrap());

// Tag: # followed by a word that does not start with a digit. The character
// before # must not be a word character or & (HTML entities).
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w&])#([a-zA-Z_][\w/.-]*)").unwrap());

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*([^:\n`\[\]]+?)::").unwrap());

/// How a page reference was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefStyle {
    Link,
    Tag,
    Attribute,
}

/// A page reference found in block text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub title: String,
    pub style: RefStyle,
    /// Byte offset of the reference in the block text.
    pub start: usize,
}

/// Parse every page reference in a block, in order of appearance.
pub fn parse_page_refs(content: &str) -> Vec<PageRef> {
    let code_spans = find_code_spans(content);
    let mut refs = Vec::new();

    for cap in PAGE_LINK.captures_iter(content) {
        let full = cap.get(0).unwrap();
        if is_in_code_span(full.start(), &code_spans) {
            continue;
        }
        let title = cap.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if title.is_empty() {
            continue;
        }
        refs.push(PageRef {
            title: title.to_string(),
            style: RefStyle::Link,
            start: full.start(),
        });
    }

    for cap in TAG.captures_iter(content) {
        let name = cap.get(1).unwrap();
        let start = name.start() - 1;
        if is_in_code_span(start, &code_spans) || is_in_page_link(content, start) {
            continue;
        }
        // A trailing '.' ends the sentence, not the tag.
        let title = name.as_str().trim_end_matches('.');
        refs.push(PageRef {
            title: title.to_string(),
            style: RefStyle::Tag,
            start,
        });
    }

    for cap in ATTRIBUTE.captures_iter(content) {
        let name = cap.get(1).unwrap();
        if is_in_code_span(name.start(), &code_spans) {
            continue;
        }
        let title = name.as_str().trim();
        if title.is_empty() {
            continue;
        }
        refs.push(PageRef {
            title: title.to_string(),
            style: RefStyle::Attribute,
            start: name.start(),
        });
    }

    refs.sort_by_key(|r| r.start);
    refs
}

/// Unique referenced page titles, preserving first-occurrence order.
pub fn page_ref_titles(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    parse_page_refs(content)
        .into_iter()
        .filter(|r| seen.insert(r.title.to_lowercase()))
        .map(|r| r.title)
        .collect()
}

/// Check whether a position is between `[[` and `]]`.
fn is_in_page_link(content: &str, pos: usize) -> bool {
    let before = &content[..pos];
    let after = &content[pos..];

    match (before.rfind("[["), before.rfind("]]")) {
        (Some(open), Some(close)) if open > close => after.contains("]]"),
        (Some(_), None) => after.contains("]]"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_link() {
        let refs = parse_page_refs("Discussed with [[Alice]] about [[Project Alpha]]");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].title, "Alice");
        assert_eq!(refs[0].style, RefStyle::Link);
        assert_eq!(refs[1].title, "Project Alpha");
    }

    #[test]
    fn test_tag_and_bracket_tag() {
        let titles = page_ref_titles("todo #urgent and #[[long tag]].");
        assert_eq!(titles, vec!["urgent".to_string(), "long tag".to_string()]);
    }

    #[test]
    fn test_tag_not_html_entity_or_number() {
        assert!(page_ref_titles("&#123; and #42").is_empty());
    }

    #[test]
    fn test_tag_inside_link_ignored() {
        let refs = parse_page_refs("[[C# notes]]");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].style, RefStyle::Link);
    }

    #[test]
    fn test_attribute() {
        let refs = parse_page_refs("Status:: [[Done]]");
        let titles: Vec<&str> = refs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Status", "Done"]);
        assert_eq!(refs[0].style, RefStyle::Attribute);
    }

    #[test]
    fn test_skip_code() {
        assert!(page_ref_titles("`[[not a ref]]` and `#nope`").is_empty());
    }

    #[test]
    fn test_titles_deduplicated_case_insensitive() {
        let titles = page_ref_titles("[[Risk]] and #risk again [[Risk]]");
        assert_eq!(titles, vec!["Risk".to_string()]);
    }
}
