//! Merging and deduplication of branch results.
//!
//! All functions here are pure: the output depends only on the completed
//! branch results and their order, never on when each branch finished.

use crate::types::{CombineMode, MatchResult, NodeId, NodeRecord};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A node found by a strategy branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub record: NodeRecord,

    /// Descendants that matched the other operand.
    pub covered: BTreeSet<NodeId>,

    /// Every descendant inspected for this hit.
    pub subtree: BTreeSet<NodeId>,
}

impl Hit {
    pub fn bare(record: NodeRecord) -> Self {
        Self {
            record,
            covered: BTreeSet::new(),
            subtree: BTreeSet::new(),
        }
    }
}

/// Anything identified by a node id.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Hit {
    fn key(&self) -> &str {
        &self.record.id
    }
}

impl Keyed for MatchResult {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for NodeRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Union by id in branch order; the first occurrence of an id wins.
pub fn merge_prioritized<T: Keyed>(branches: Vec<Vec<T>>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for branch in branches {
        for item in branch {
            if seen.insert(item.key().to_string()) {
                out.push(item);
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    SameNode,
    Forward,
    Reverse,
}

/// Insertion-ordered id map whose entries can be removed or replaced in place.
struct OrderedHits {
    slots: Vec<Option<(Hit, Origin)>>,
    index: HashMap<NodeId, usize>,
}

impl OrderedHits {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn insert(&mut self, hit: Hit, origin: Origin) {
        self.index.insert(hit.record.id.clone(), self.slots.len());
        self.slots.push(Some((hit, origin)));
    }

    fn origin(&self, id: &str) -> Option<Origin> {
        let slot = *self.index.get(id)?;
        self.slots[slot].as_ref().map(|(_, origin)| *origin)
    }

    fn remove(&mut self, id: &str) -> Option<usize> {
        let slot = self.index.remove(id)?;
        self.slots[slot] = None;
        Some(slot)
    }

    fn put_at(&mut self, slot: usize, hit: Hit, origin: Origin) {
        self.index.insert(hit.record.id.clone(), slot);
        self.slots[slot] = Some((hit, origin));
    }

    fn into_hits(self) -> Vec<Hit> {
        self.slots.into_iter().flatten().map(|(hit, _)| hit).collect()
    }
}

/// Merge the three branches of a bidirectional strategy.
///
/// Same-node hits go in first, then forward hits not already present. A
/// reverse hit is dropped when it is already present or is a covered
/// descendant of a forward hit. When its subtree contains forward hits, those
/// are removed and the reverse hit takes the place of the first one.
pub fn merge_bidirectional(same: Vec<Hit>, forward: Vec<Hit>, reverse: Vec<Hit>) -> Vec<Hit> {
    let mut merged = OrderedHits::new();

    for hit in same {
        if !merged.contains(hit.key()) {
            merged.insert(hit, Origin::SameNode);
        }
    }

    let mut covered: HashSet<NodeId> = HashSet::new();
    for hit in forward {
        covered.extend(hit.covered.iter().cloned());
        if !merged.contains(hit.key()) {
            merged.insert(hit, Origin::Forward);
        }
    }

    for hit in reverse {
        if merged.contains(hit.key()) || covered.contains(hit.key()) {
            continue;
        }

        let superseded: Vec<&NodeId> = hit
            .subtree
            .iter()
            .filter(|id| merged.origin(id) == Some(Origin::Forward))
            .collect();

        let first_slot = superseded
            .iter()
            .filter_map(|id| merged.index.get(id.as_str()).copied())
            .min();

        match first_slot {
            Some(slot) => {
                let ids: Vec<NodeId> = superseded.into_iter().cloned().collect();
                for id in &ids {
                    merged.remove(id);
                }
                merged.put_at(slot, hit, Origin::Reverse);
            }
            None => merged.insert(hit, Origin::Reverse),
        }
    }

    merged.into_hits()
}

/// Combine independent branches by id union or intersection.
///
/// Order follows the first branch an id appears in.
pub fn combine_many_branches(branches: Vec<Vec<MatchResult>>, mode: CombineMode) -> Vec<MatchResult> {
    match mode {
        CombineMode::Union => merge_prioritized(branches),
        CombineMode::Intersection => {
            let id_sets: Vec<HashSet<String>> = branches
                .iter()
                .map(|b| b.iter().map(|r| r.id.clone()).collect())
                .collect();
            let Some(first) = branches.into_iter().next() else {
                return Vec::new();
            };
            let mut seen = HashSet::new();
            first
                .into_iter()
                .filter(|r| id_sets.iter().all(|ids| ids.contains(&r.id)))
                .filter(|r| seen.insert(r.id.clone()))
                .collect()
        }
    }
}
