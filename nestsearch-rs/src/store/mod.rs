//! Contracts for the collaborators the engine talks to.
//!
//! - [`GraphStore`]: flat content-matching queries over the node graph
//! - [`HierarchyReader`]: depth-bounded descendant and ancestor listings
//! - [`TermExpander`]: best-effort synonym / related / broader term lookup
//!
//! The engine only ever holds these as trait objects, so any backend that can
//! answer a [`StoreQuery`] can be plugged in. [`MemoryGraph`] implements the
//! first two over a loaded export; [`SynonymExpander`] implements the third.

pub mod expansion;
pub mod memory;

use crate::condition::ConditionSet;
use crate::error::Result;
use crate::types::{HierarchyEntry, NodeId, NodeRecord, Scope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use expansion::SynonymExpander;
pub use memory::MemoryGraph;

// ============================================================================
// Query IR
// ============================================================================

/// The store-agnostic query the engine issues.
///
/// Every set in `node` must hold on the returned node. When `child` is set,
/// at least one direct child of the node must satisfy it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreQuery {
    pub node: Vec<ConditionSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<ConditionSet>,

    #[serde(default)]
    pub scope: Scope,
}

impl StoreQuery {
    /// Nodes matching a single condition set.
    pub fn matching(set: ConditionSet, scope: Scope) -> Self {
        Self {
            node: vec![set],
            child: None,
            scope,
        }
    }

    /// Nodes matching `parent` that have a direct child matching `child`.
    pub fn with_child(parent: ConditionSet, child: ConditionSet, scope: Scope) -> Self {
        Self {
            node: vec![parent],
            child: Some(child),
            scope,
        }
    }

    /// Nodes matching every one of `sets`.
    pub fn all_of(sets: Vec<ConditionSet>, scope: Scope) -> Self {
        Self {
            node: sets,
            child: None,
            scope,
        }
    }
}

// ============================================================================
// Content graph store
// ============================================================================

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run one flat query, returning matching nodes in store order.
    async fn query(&self, query: &StoreQuery) -> Result<Vec<NodeRecord>>;
}

// ============================================================================
// Hierarchy reader
// ============================================================================

/// Batched, depth-bounded tree lookups.
#[async_trait]
pub trait HierarchyReader: Send + Sync {
    /// Descendants of each id down to `depth` levels, in breadth-first order.
    ///
    /// Ids that are unknown or have no children map to an empty list.
    async fn descendants(
        &self,
        ids: &[NodeId],
        depth: usize,
    ) -> Result<HashMap<NodeId, Vec<HierarchyEntry>>>;

    /// Ancestors of each id up to `depth` levels, nearest first.
    async fn ancestors(
        &self,
        ids: &[NodeId],
        depth: usize,
    ) -> Result<HashMap<NodeId, Vec<NodeRecord>>>;
}

// ============================================================================
// Term expansion
// ============================================================================

/// Which relation a term expansion follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionStrategy {
    #[default]
    Synonyms,
    Related,
    Broader,
}

impl std::str::FromStr for ExpansionStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "synonyms" => Ok(ExpansionStrategy::Synonyms),
            "related" => Ok(ExpansionStrategy::Related),
            "broader" => Ok(ExpansionStrategy::Broader),
            other => Err(format!("unknown expansion strategy: {}", other)),
        }
    }
}

#[async_trait]
pub trait TermExpander: Send + Sync {
    /// Up to `max_terms` terms related to `term`, never including `term` itself.
    async fn expand(
        &self,
        term: &str,
        strategy: ExpansionStrategy,
        max_terms: usize,
    ) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;

    #[test]
    fn test_store_query_constructors() {
        let q = StoreQuery::with_child(
            ConditionSet::all(vec![Condition::text("risk")]),
            ConditionSet::all(vec![Condition::text("mitigation")]),
            Scope::all(),
        );
        assert_eq!(q.node.len(), 1);
        assert!(q.child.is_some());

        let q = StoreQuery::all_of(
            vec![
                ConditionSet::all(vec![Condition::text("a")]),
                ConditionSet::all(vec![Condition::text("b")]),
            ],
            Scope::all(),
        );
        assert_eq!(q.node.len(), 2);
        assert!(q.child.is_none());
    }

    #[test]
    fn test_expansion_strategy_from_str() {
        assert_eq!("Related".parse::<ExpansionStrategy>(), Ok(ExpansionStrategy::Related));
        assert!("nearby".parse::<ExpansionStrategy>().is_err());
    }
}
