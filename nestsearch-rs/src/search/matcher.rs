//! Condition evaluation against node records.
//!
//! Conditions are compiled once per query into [`CompiledSet`]s; regexes that
//! fail to compile turn into predicates that never match, so one bad pattern
//! cannot abort a search.

use crate::condition::{Condition, ConditionKind, ConditionSet, MatchMode};
use crate::error::{Result, SearchError};
use crate::types::{Combine, NodeRecord};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

/// NFC-normalize and lowercase text for case-insensitive comparison.
pub fn normalize(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

/// Build a regex honouring `i`, `m`, `s`, `x` flags. `g`, `u` and `y` are accepted and ignored.
pub fn build_regex(pattern: &str, flags: Option<&str>) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.unwrap_or("").chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'g' | 'u' | 'y' => {}
            other => debug!(flag = %other, pattern, "Ignoring unknown regex flag"),
        }
    }
    builder.build().map_err(|source| SearchError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

// ============================================================================
// Compiled predicates
// ============================================================================

#[derive(Debug, Clone)]
enum Predicate {
    Contains(String),
    Exact(String),
    Pattern(Regex),
    PageRef(String),
    BlockRef(String),
    /// A condition whose regex failed to compile.
    Never,
}

impl Predicate {
    fn compile(condition: &Condition) -> Self {
        let compiled = match condition.kind {
            ConditionKind::Text => match condition.match_mode {
                MatchMode::Contains => Ok(Predicate::Contains(normalize(&condition.pattern))),
                MatchMode::Exact => Ok(Predicate::Exact(normalize(condition.pattern.trim()))),
                MatchMode::Regex => build_regex(&condition.pattern, Some("i")).map(Predicate::Pattern),
            },
            ConditionKind::Regex => {
                build_regex(&condition.pattern, condition.regex_flags.as_deref())
                    .map(Predicate::Pattern)
            }
            ConditionKind::PageRef => Ok(Predicate::PageRef(normalize(condition.pattern.trim()))),
            ConditionKind::BlockRef => Ok(Predicate::BlockRef(
                condition
                    .pattern
                    .trim()
                    .trim_start_matches("((")
                    .trim_end_matches("))")
                    .to_string(),
            )),
        };

        compiled.unwrap_or_else(|e| {
            warn!(error = %e, "Condition will match nothing");
            Predicate::Never
        })
    }

    fn matches(&self, record: &NodeRecord, content: &str) -> bool {
        match self {
            Predicate::Contains(needle) => content.contains(needle.as_str()),
            Predicate::Exact(value) => content.trim() == value,
            Predicate::Pattern(re) => re.is_match(&record.content),
            Predicate::PageRef(title) => record.page_refs.iter().any(|r| normalize(r) == *title),
            Predicate::BlockRef(id) => record.block_refs.iter().any(|r| r == id),
            Predicate::Never => false,
        }
    }
}

/// A condition ready to evaluate.
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    primary: Predicate,
    alternatives: Vec<Predicate>,
    negate: bool,
}

impl CompiledCondition {
    pub fn compile(condition: &Condition) -> Self {
        Self {
            primary: Predicate::compile(condition),
            alternatives: condition.alternatives.iter().map(Predicate::compile).collect(),
            negate: condition.negate,
        }
    }

    /// Whether the predicate (or one of its alternatives) holds, ignoring negation.
    fn hits(&self, record: &NodeRecord, content: &str) -> bool {
        self.primary.matches(record, content)
            || self.alternatives.iter().any(|p| p.matches(record, content))
    }

    /// Evaluate with negation applied.
    pub fn matches(&self, record: &NodeRecord) -> bool {
        let content = normalize(&record.content);
        self.hits(record, &content) != self.negate
    }
}

/// A condition set ready to evaluate.
///
/// Negated conditions are exclusion filters regardless of the combine rule.
#[derive(Debug, Clone)]
pub struct CompiledSet {
    positives: Vec<CompiledCondition>,
    negatives: Vec<CompiledCondition>,
    combine: Combine,
}

impl CompiledSet {
    pub fn compile(set: &ConditionSet) -> Self {
        Self {
            positives: set.positives().map(CompiledCondition::compile).collect(),
            negatives: set.negatives().map(CompiledCondition::compile).collect(),
            combine: set.combine,
        }
    }

    pub fn matches(&self, record: &NodeRecord) -> bool {
        let content = normalize(&record.content);

        if self.negatives.iter().any(|c| c.hits(record, &content)) {
            return false;
        }
        if self.positives.is_empty() {
            return true;
        }
        match self.combine {
            Combine::And => self.positives.iter().all(|c| c.hits(record, &content)),
            Combine::Or => self.positives.iter().any(|c| c.hits(record, &content)),
        }
    }
}

// ============================================================================
// Match quality (for ranking)
// ============================================================================

/// How well a text pattern matches a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchQuality {
    None,
    Substring,
    WholeWord,
    Exact,
}

/// Grade a pattern against already-normalized content.
pub fn match_quality(normalized_content: &str, pattern: &str) -> MatchQuality {
    let needle = normalize(pattern.trim());
    if needle.is_empty() {
        return MatchQuality::None;
    }
    if normalized_content.trim() == needle {
        return MatchQuality::Exact;
    }

    let mut found = false;
    for (start, _) in normalized_content.match_indices(needle.as_str()) {
        found = true;
        let end = start + needle.len();
        let before = normalized_content[..start].chars().next_back();
        let after = normalized_content[end..].chars().next();
        let is_boundary = |c: Option<char>| c.is_none_or(|c| !c.is_alphanumeric() && c != '_');
        if is_boundary(before) && is_boundary(after) {
            return MatchQuality::WholeWord;
        }
    }

    if found {
        MatchQuality::Substring
    } else {
        MatchQuality::None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> NodeRecord {
        NodeRecord {
            id: "n1".to_string(),
            content: content.to_string(),
            container_id: "p1".to_string(),
            container_title: "Page".to_string(),
            created_at: None,
            modified_at: None,
            is_container: false,
            is_date_node: false,
            page_refs: crate::markup::page_ref::page_ref_titles(content),
            block_refs: crate::markup::parse_block_refs(content),
        }
    }

    fn matches(condition: Condition, content: &str) -> bool {
        CompiledCondition::compile(&condition).matches(&record(content))
    }

    // -- Text --

    #[test]
    fn test_contains_case_insensitive() {
        assert!(matches(Condition::text("RISK"), "project risk register"));
        assert!(!matches(Condition::text("risk"), "project plan"));
    }

    #[test]
    fn test_contains_unicode_normalized() {
        // "é" precomposed vs. "e" + combining acute
        assert!(matches(Condition::text("caf\u{e9}"), "cafe\u{301} meeting"));
    }

    #[test]
    fn test_exact() {
        let c = Condition::text("mitigation plan").with_mode(MatchMode::Exact);
        assert!(matches(c.clone(), "  Mitigation Plan "));
        assert!(!matches(c, "mitigation plan v2"));
    }

    #[test]
    fn test_text_regex_mode() {
        let c = Condition::text("risk\\s+\\d").with_mode(MatchMode::Regex);
        assert!(matches(c, "RISK 3"));
    }

    // -- Regex --

    #[test]
    fn test_regex_flags() {
        assert!(!matches(Condition::regex("^todo", None), "TODO: call"));
        assert!(matches(Condition::regex("^todo", Some("i")), "TODO: call"));
        assert!(matches(
            Condition::regex("^call", Some("mi")),
            "TODO:\ncall back"
        ));
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        assert!(!matches(Condition::regex("(unclosed", None), "(unclosed"));
        // A broken exclusion excludes nothing.
        assert!(matches(Condition::regex("(unclosed", None).negated(), "anything"));
    }

    #[test]
    fn test_build_regex_error() {
        let err = build_regex("[", None).unwrap_err();
        assert!(matches!(err, SearchError::Regex { .. }));
    }

    // -- References --

    #[test]
    fn test_page_ref() {
        assert!(matches(Condition::page_ref("project alpha"), "see [[Project Alpha]]"));
        assert!(matches(Condition::page_ref("urgent"), "#urgent fix"));
        assert!(!matches(Condition::page_ref("alpha"), "alpha without link"));
    }

    #[test]
    fn test_block_ref() {
        assert!(matches(Condition::block_ref("abc123"), "as in ((abc123))"));
        assert!(matches(Condition::block_ref("((abc123))"), "as in ((abc123))"));
        assert!(!matches(Condition::block_ref("abc123"), "abc123"));
    }

    // -- Negation and alternatives --

    #[test]
    fn test_negate() {
        assert!(!matches(Condition::text("draft").negated(), "draft notes"));
        assert!(matches(Condition::text("draft").negated(), "final notes"));
    }

    #[test]
    fn test_alternatives() {
        let mut c = Condition::text("risk");
        c.alternatives.push(c.alternative("hazard"));
        assert!(matches(c, "fire hazard"));
    }

    // -- Sets --

    #[test]
    fn test_set_and_or() {
        let and = CompiledSet::compile(&ConditionSet::all(vec![
            Condition::text("alpha"),
            Condition::text("beta"),
        ]));
        assert!(and.matches(&record("alpha and beta")));
        assert!(!and.matches(&record("alpha only")));

        let or = CompiledSet::compile(&ConditionSet::any(vec![
            Condition::text("alpha"),
            Condition::text("beta"),
        ]));
        assert!(or.matches(&record("beta only")));
        assert!(!or.matches(&record("gamma")));
    }

    #[test]
    fn test_set_negation_excludes_under_or() {
        let set = CompiledSet::compile(&ConditionSet::any(vec![
            Condition::text("alpha"),
            Condition::text("beta"),
            Condition::text("draft").negated(),
        ]));
        assert!(set.matches(&record("alpha final")));
        assert!(!set.matches(&record("alpha draft")));
    }

    #[test]
    fn test_set_only_negatives() {
        let set = CompiledSet::compile(&ConditionSet::all(vec![Condition::text("draft").negated()]));
        assert!(set.matches(&record("anything")));
        assert!(!set.matches(&record("a draft")));
    }

    // -- Quality --

    #[test]
    fn test_match_quality() {
        assert_eq!(match_quality("x", "x"), MatchQuality::Exact);
        assert_eq!(match_quality("project risk", "risk"), MatchQuality::WholeWord);
        assert_eq!(match_quality("risky plan", "risk"), MatchQuality::Substring);
        assert_eq!(match_quality("plan", "risk"), MatchQuality::None);
        assert_eq!(match_quality("risky and risk", "risk"), MatchQuality::WholeWord);
    }
}
