//! Matchable predicates and the flat condition-set IR.

use crate::error::{Result, SearchError};
use crate::types::Combine;
use serde::{Deserialize, Serialize};

/// Weight multiplier applied to terms produced by expansion.
pub const EXPANSION_WEIGHT_FACTOR: f64 = 0.8;

/// What a condition matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Node text.
    Text,
    /// A reference to a page by title.
    PageRef,
    /// A reference to a block by id.
    BlockRef,
    /// A regular expression over node text.
    Regex,
}

/// How a text condition compares against node content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Whole content equals the pattern (case-insensitive).
    Exact,
    /// Case-insensitive substring match (default).
    #[default]
    Contains,
    /// The pattern is a case-insensitive regular expression.
    Regex,
}

/// A single matchable predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub pattern: String,

    #[serde(default)]
    pub match_mode: MatchMode,

    #[serde(default = "default_weight")]
    pub weight: f64,

    #[serde(default)]
    pub negate: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_flags: Option<String>,

    /// Ask the flat search executor to broaden this condition via term expansion.
    #[serde(default)]
    pub expand: bool,

    /// OR-ed variants produced by expansion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Condition>,
}

fn default_weight() -> f64 {
    1.0
}

impl Condition {
    fn new(kind: ConditionKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
            match_mode: MatchMode::Contains,
            weight: default_weight(),
            negate: false,
            regex_flags: None,
            expand: false,
            alternatives: Vec::new(),
        }
    }

    /// Plain text condition (substring match).
    pub fn text(pattern: impl Into<String>) -> Self {
        Self::new(ConditionKind::Text, pattern)
    }

    /// Page-reference condition.
    pub fn page_ref(title: impl Into<String>) -> Self {
        Self::new(ConditionKind::PageRef, title)
    }

    /// Block-reference condition.
    pub fn block_ref(id: impl Into<String>) -> Self {
        Self::new(ConditionKind::BlockRef, id)
    }

    /// Regex condition with optional flags (e.g. `"i"`).
    pub fn regex(pattern: impl Into<String>, flags: Option<&str>) -> Self {
        let mut condition = Self::new(ConditionKind::Regex, pattern);
        condition.match_mode = MatchMode::Regex;
        condition.regex_flags = flags.filter(|f| !f.is_empty()).map(str::to_string);
        condition
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn expanded(mut self) -> Self {
        self.expand = true;
        self
    }

    /// Build the alternative that expansion adds for `term`.
    pub fn alternative(&self, term: impl Into<String>) -> Self {
        let mut alt = Self::new(self.kind, term);
        alt.match_mode = self.match_mode;
        alt.weight = self.weight * EXPANSION_WEIGHT_FACTOR;
        alt
    }

    /// Check the invariants: non-empty pattern, finite non-negative weight.
    pub fn validate(&self) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(SearchError::InvalidCondition(
                "pattern must not be empty".to_string(),
            ));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(SearchError::InvalidCondition(format!(
                "weight must be finite and non-negative, got {}",
                self.weight
            )));
        }
        for alt in &self.alternatives {
            alt.validate()?;
        }
        Ok(())
    }

    /// Whether the ranker scores this condition.
    pub fn is_scored_text(&self) -> bool {
        self.kind == ConditionKind::Text && !self.negate
    }
}

/// A flat list of conditions with a combine rule; the unit the store queries on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionSet {
    pub conditions: Vec<Condition>,
    pub combine: Combine,
}

impl ConditionSet {
    pub fn new(conditions: Vec<Condition>, combine: Combine) -> Self {
        Self {
            conditions,
            combine,
        }
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::new(conditions, Combine::And)
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::new(conditions, Combine::Or)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.conditions.is_empty() {
            return Err(SearchError::InvalidCondition(
                "condition set is empty".to_string(),
            ));
        }
        self.conditions.iter().try_for_each(Condition::validate)
    }

    /// Positive (non-negated) conditions.
    pub fn positives(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(|c| !c.negate)
    }

    /// Negated conditions; these always act as exclusion filters.
    pub fn negatives(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(|c| c.negate)
    }
}
