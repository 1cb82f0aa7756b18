//! Batched hierarchy lookups and result enrichment.

use crate::error::Result;
use crate::store::HierarchyReader;
use crate::types::{HierarchyEntry, MatchResult, NodeId, NodeRecord};
use std::collections::HashMap;
use tracing::debug;

/// Wraps a [`HierarchyReader`] so that callers never issue per-node lookups.
#[derive(Clone, Copy)]
pub struct HierarchyAdapter<'a> {
    reader: &'a dyn HierarchyReader,
}

impl<'a> HierarchyAdapter<'a> {
    pub fn new(reader: &'a dyn HierarchyReader) -> Self {
        Self { reader }
    }

    /// Descendants of all `ids` in one call. Skips the call when there is nothing to ask.
    pub async fn descendants(
        &self,
        ids: &[NodeId],
        depth: usize,
    ) -> Result<HashMap<NodeId, Vec<HierarchyEntry>>> {
        if ids.is_empty() || depth == 0 {
            return Ok(HashMap::new());
        }
        let map = self.reader.descendants(ids, depth).await?;
        debug!(nodes = ids.len(), depth, "Batched descendants lookup");
        Ok(map)
    }

    /// Ancestors of all `ids` in one call, nearest first.
    pub async fn ancestors(
        &self,
        ids: &[NodeId],
        depth: usize,
    ) -> Result<HashMap<NodeId, Vec<NodeRecord>>> {
        if ids.is_empty() || depth == 0 {
            return Ok(HashMap::new());
        }
        let map = self.reader.ancestors(ids, depth).await?;
        debug!(nodes = ids.len(), depth, "Batched ancestors lookup");
        Ok(map)
    }

    /// Attach children (to `children_depth`) and parents (to `parents_depth`)
    /// to every result, then recompute hierarchy depths.
    pub async fn enrich(
        &self,
        results: &mut [MatchResult],
        children_depth: usize,
        parents_depth: usize,
    ) -> Result<()> {
        let ids: Vec<NodeId> = results.iter().map(|r| r.id.clone()).collect();

        let (descendants, ancestors) = tokio::join!(
            self.descendants(&ids, children_depth),
            self.ancestors(&ids, parents_depth)
        );
        let descendants = descendants?;
        let ancestors = ancestors?;

        for result in results.iter_mut() {
            if let Some(entries) = descendants.get(&result.id) {
                result.children = build_children(entries, &result.id, children_depth);
            }
            if let Some(parents) = ancestors.get(&result.id) {
                result.parents = parents.iter().map(MatchResult::from_record).collect();
            }
            result.compute_depth();
        }
        Ok(())
    }
}

/// Rebuild the child tree under `root` from a flat descendant listing.
pub fn build_children(entries: &[HierarchyEntry], root: &str, depth: usize) -> Vec<MatchResult> {
    let mut by_parent: HashMap<&str, Vec<&HierarchyEntry>> = HashMap::new();
    for entry in entries {
        by_parent.entry(entry.parent_id.as_str()).or_default().push(entry);
    }
    build_level(&by_parent, root, 1, depth)
}

fn build_level(
    by_parent: &HashMap<&str, Vec<&HierarchyEntry>>,
    parent: &str,
    level: usize,
    depth: usize,
) -> Vec<MatchResult> {
    if level > depth {
        return Vec::new();
    }
    let Some(children) = by_parent.get(parent) else {
        return Vec::new();
    };
    children
        .iter()
        .filter(|entry| entry.level == level)
        .map(|entry| {
            let mut child = MatchResult::from_record(&entry.record);
            child.children = build_level(by_parent, &entry.record.id, level + 1, depth);
            child
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryGraph;

    fn graph() -> MemoryGraph {
        MemoryGraph::from_json_str(
            r#"[{"title": "P", "uid": "p", "children": [
                {"string": "a", "uid": "a", "children": [
                    {"string": "b", "uid": "b", "children": [
                        {"string": "c", "uid": "c"}
                    ]}
                ]}
            ]}]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_enrich() {
        let g = graph();
        let adapter = HierarchyAdapter::new(&g);
        let mut results = vec![MatchResult::from_record(g.get("a").unwrap())];

        adapter.enrich(&mut results, 2, 1).await.unwrap();
        let a = &results[0];
        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].id, "b");
        assert_eq!(a.children[0].children[0].id, "c");
        assert_eq!(a.hierarchy_depth, 2);
        assert_eq!(a.parents.len(), 1);
        assert_eq!(a.parents[0].id, "p");
    }

    #[tokio::test]
    async fn test_enrich_disabled() {
        let g = graph();
        let adapter = HierarchyAdapter::new(&g);
        let mut results = vec![MatchResult::from_record(g.get("a").unwrap())];

        adapter.enrich(&mut results, 0, 0).await.unwrap();
        assert!(results[0].children.is_empty());
        assert!(results[0].parents.is_empty());
        assert_eq!(results[0].hierarchy_depth, 0);
    }

    #[test]
    fn test_build_children_respects_depth() {
        let g = graph();
        let record = |id: &str| g.get(id).unwrap().clone();
        let entries = vec![
            HierarchyEntry { record: record("b"), level: 1, parent_id: "a".to_string() },
            HierarchyEntry { record: record("c"), level: 2, parent_id: "b".to_string() },
        ];

        let tree = build_children(&entries, "a", 1);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());

        let tree = build_children(&entries, "a", 2);
        assert_eq!(tree[0].children.len(), 1);
    }
}
