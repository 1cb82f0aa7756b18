//! Shared types for nestsearch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Opaque identifier of a node (block or page) in the content graph.
pub type NodeId = String;

/// How the members of a condition set (or the operands of a compound) combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    /// Every condition must hold.
    #[default]
    And,
    /// At least one condition must hold.
    Or,
}

/// How independent result branches are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    #[default]
    Union,
    Intersection,
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Text-match score blended with structural context.
    #[default]
    Relevance,
    /// Most recently edited first.
    Recent,
    /// Container title, ascending.
    ContainerTitle,
    /// Deepest populated child tree first.
    HierarchyDepth,
}

/// Whether daily-note (date) nodes take part in a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateNodeFilter {
    #[default]
    Include,
    Exclude,
    Only,
}

impl DateNodeFilter {
    pub fn admits(self, is_date_node: bool) -> bool {
        match self {
            DateNodeFilter::Include => true,
            DateNodeFilter::Exclude => !is_date_node,
            DateNodeFilter::Only => is_date_node,
        }
    }
}

/// Restriction applied to the nodes a store query may return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    /// Only these nodes may match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ids: Option<BTreeSet<NodeId>>,

    /// Only nodes inside these containers (pages) may match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_ids: Option<BTreeSet<NodeId>>,

    #[serde(default)]
    pub date_nodes: DateNodeFilter,
}

impl Scope {
    /// An unrestricted scope.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether a record falls inside this scope.
    pub fn admits(&self, record: &NodeRecord) -> bool {
        if let Some(ref ids) = self.node_ids {
            if !ids.contains(&record.id) {
                return false;
            }
        }
        if let Some(ref containers) = self.container_ids {
            if !containers.contains(&record.container_id) {
                return false;
            }
        }
        self.date_nodes.admits(record.is_date_node)
    }
}

/// A node as returned by the content graph store or the hierarchy reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,

    /// Block text, or the title for a container.
    pub content: String,

    pub container_id: NodeId,
    pub container_title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_container: bool,

    #[serde(default)]
    pub is_date_node: bool,

    /// Titles of pages this node references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_refs: Vec<String>,

    /// Ids of blocks this node references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_refs: Vec<NodeId>,
}

/// One element of a descendant listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    pub record: NodeRecord,

    /// Distance from the node the listing was requested for (direct child = 1).
    pub level: usize,

    pub parent_id: NodeId,
}

/// A located content node, as handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: NodeId,

    /// Omitted in secure mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    pub container_id: NodeId,
    pub container_title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,

    pub is_date_node: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MatchResult>,

    /// Nearest ancestor first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<MatchResult>,

    pub hierarchy_depth: usize,
    pub is_container: bool,
}

impl MatchResult {
    /// Build a bare result (no children or parents) from a store record.
    pub fn from_record(record: &NodeRecord) -> Self {
        Self {
            id: record.id.clone(),
            content: Some(record.content.clone()),
            container_id: record.container_id.clone(),
            container_title: record.container_title.clone(),
            created_at: record.created_at,
            modified_at: record.modified_at,
            is_date_node: record.is_date_node,
            children: Vec::new(),
            parents: Vec::new(),
            hierarchy_depth: 0,
            is_container: record.is_container,
        }
    }

    /// Recompute `hierarchy_depth` from the populated children.
    pub fn compute_depth(&mut self) -> usize {
        let depth = self
            .children
            .iter_mut()
            .map(|child| child.compute_depth() + 1)
            .max()
            .unwrap_or(0);
        self.hierarchy_depth = depth;
        depth
    }

    /// Strip content from this result and everything attached to it.
    pub fn redact(&mut self) {
        self.content = None;
        for child in &mut self.children {
            child.redact();
        }
        for parent in &mut self.parents {
            parent.redact();
        }
    }

    /// Ids of all children at any populated depth.
    pub fn descendant_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        let mut stack: Vec<&MatchResult> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            ids.push(node.id.as_str());
            stack.extend(node.children.iter());
        }
        ids
    }
}

/// Compare optional timestamps so that newer sorts first and missing values last.
pub fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// What an invocation hands back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOutput {
    pub results: Vec<MatchResult>,

    /// Merged result count before truncation to the limit.
    pub total: usize,

    /// Failures that were recovered locally.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
