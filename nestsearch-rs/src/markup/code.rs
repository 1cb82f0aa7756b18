//! Code span detection for skipping reference parsing inside code.

use regex::Regex;
use std::sync::LazyLock;

/// A byte range of block text that is inside a code fence or inline code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Whether this is a fenced block (vs inline code).
    pub is_fenced: bool,
}

// Blocks carry fences inline, so a fence may open and close on the same line.
static FENCED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());

static INLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());

/// Find all fenced and inline code spans in block text.
pub fn find_code_spans(content: &str) -> Vec<CodeSpan> {
    let mut spans: Vec<CodeSpan> = FENCED
        .find_iter(content)
        .map(|m| CodeSpan {
            start: m.start(),
            end: m.end(),
            is_fenced: true,
        })
        .collect();

    for m in INLINE.find_iter(content) {
        if is_in_code_span(m.start(), &spans) {
            continue;
        }
        spans.push(CodeSpan {
            start: m.start(),
            end: m.end(),
            is_fenced: false,
        });
    }

    spans.sort_by_key(|s| s.start);
    spans
}

/// Check whether a byte offset falls inside any of the spans.
pub fn is_in_code_span(pos: usize, spans: &[CodeSpan]) -> bool {
    spans.iter().any(|s| pos >= s.start && pos < s.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_code() {
        let content = "see `[[Not a ref]]` here";
        let spans = find_code_spans(content);
        assert_eq!(spans.len(), 1);
        assert!(!spans[0].is_fenced);
        assert!(is_in_code_span(content.find("[[").unwrap(), &spans));
        assert!(!is_in_code_span(0, &spans));
    }

    #[test]
    fn test_fenced_same_line() {
        let content = "```js\nconst a = `x`;\n``` after";
        let spans = find_code_spans(content);
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_fenced);
        assert!(!is_in_code_span(content.find("after").unwrap(), &spans));
    }

    #[test]
    fn test_no_code() {
        assert!(find_code_spans("plain [[Page]] text").is_empty());
    }
}
