//! Per-invocation options.

use crate::store::ExpansionStrategy;
use crate::types::{Scope, SortMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHILDREN_DEPTH: usize = 2;
pub const DEFAULT_PARENTS_DEPTH: usize = 1;
pub const DEFAULT_MAX_EXPANSION_TERMS: usize = 5;

/// Options shared by every engine entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Overrides the operator's default traversal depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default)]
    pub sort: SortMode,

    #[serde(default)]
    pub scope: Scope,

    /// Levels of children attached to each result; 0 disables.
    #[serde(default = "default_children_depth")]
    pub children_depth: usize,

    /// Levels of parents attached to each result; 0 disables.
    #[serde(default = "default_parents_depth")]
    pub parents_depth: usize,

    /// Strip content from results.
    #[serde(default)]
    pub secure: bool,

    /// Expand every text condition, not just those flagged.
    #[serde(default)]
    pub expand_all: bool,

    #[serde(default)]
    pub expansion_strategy: ExpansionStrategy,

    #[serde(default = "default_max_expansion_terms")]
    pub max_expansion_terms: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

fn default_children_depth() -> usize {
    DEFAULT_CHILDREN_DEPTH
}

fn default_parents_depth() -> usize {
    DEFAULT_PARENTS_DEPTH
}

fn default_max_expansion_terms() -> usize {
    DEFAULT_MAX_EXPANSION_TERMS
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            limit: None,
            sort: SortMode::default(),
            scope: Scope::default(),
            children_depth: DEFAULT_CHILDREN_DEPTH,
            parents_depth: DEFAULT_PARENTS_DEPTH,
            secure: false,
            expand_all: false,
            expansion_strategy: ExpansionStrategy::default(),
            max_expansion_terms: DEFAULT_MAX_EXPANSION_TERMS,
            timeout: None,
        }
    }
}

impl QueryOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Results without children or parents attached.
    pub fn bare(mut self) -> Self {
        self.children_depth = 0;
        self.parents_depth = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = QueryOptions::default();
        assert_eq!(opts.children_depth, 2);
        assert_eq!(opts.parents_depth, 1);
        assert_eq!(opts.max_expansion_terms, 5);
        assert_eq!(opts.sort, SortMode::Relevance);

        let parsed: QueryOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, opts);
    }

    #[test]
    fn test_bare() {
        let opts = QueryOptions::default().with_limit(3).bare();
        assert_eq!(opts.limit, Some(3));
        assert_eq!(opts.children_depth, 0);
        assert_eq!(opts.parents_depth, 0);
    }
}
