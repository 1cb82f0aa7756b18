//! In-memory graph store loaded from an outliner JSON/YAML export.

use crate::error::{Result, SearchError};
use crate::markup::page_ref::page_ref_titles;
use crate::markup::{is_daily_title, parse_block_refs};
use crate::search::matcher::CompiledSet;
use crate::store::{GraphStore, HierarchyReader, StoreQuery};
use crate::types::{HierarchyEntry, NodeId, NodeRecord, Scope};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glob::glob;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Export format
// ============================================================================

/// A page as it appears in an export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPage {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(rename = "create-time", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<i64>,

    #[serde(rename = "edit-time", default, skip_serializing_if = "Option::is_none")]
    pub edit_time: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExportBlock>,
}

/// A block as it appears in an export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBlock {
    pub string: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(rename = "create-time", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<i64>,

    #[serde(rename = "edit-time", default, skip_serializing_if = "Option::is_none")]
    pub edit_time: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExportBlock>,
}

fn timestamp(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::from_timestamp_millis)
}

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone)]
struct Node {
    record: NodeRecord,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A [`StoreQuery`] lowered into compiled predicates.
#[derive(Debug, Clone)]
pub struct LoweredQuery {
    node: Vec<CompiledSet>,
    child: Option<CompiledSet>,
    scope: Scope,
}

/// A whole note graph held in memory.
///
/// Implements both [`GraphStore`] and [`HierarchyReader`].
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: HashMap<NodeId, Node>,
    /// Document order (pages in load order, blocks pre-order).
    order: Vec<NodeId>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from parsed export pages.
    pub fn from_pages(pages: Vec<ExportPage>) -> Self {
        let mut graph = Self::new();
        for page in pages {
            graph.add_page(page);
        }
        graph
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let pages: Vec<ExportPage> = serde_json::from_str(content)?;
        Ok(Self::from_pages(pages))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let pages: Vec<ExportPage> = serde_yaml::from_str(content)?;
        Ok(Self::from_pages(pages))
    }

    /// Load a graph from an export file, or from every export file under a directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SearchError::GraphNotFound(path.to_path_buf()));
        }

        let files = if path.is_dir() {
            export_files(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let mut graph = Self::new();
        for file in &files {
            let content = std::fs::read_to_string(file)?;
            let pages: Vec<ExportPage> = match extension(file).as_deref() {
                Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
                _ => serde_json::from_str(&content)?,
            };
            debug!(file = %file.display(), pages = pages.len(), "Loaded export file");
            for page in pages {
                graph.add_page(page);
            }
        }

        info!(
            path = %path.display(),
            files = files.len(),
            nodes = graph.len(),
            "Graph loaded"
        );
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id).map(|n| &n.record)
    }

    /// Direct children of a node, in outline order.
    pub fn children_of(&self, id: &str) -> Vec<&NodeRecord> {
        self.nodes
            .get(id)
            .map(|n| n.children.iter().filter_map(|c| self.get(c)).collect())
            .unwrap_or_default()
    }

    /// Translate a store query into this store's compiled form.
    pub fn lower(query: &StoreQuery) -> Result<LoweredQuery> {
        if query.node.is_empty() {
            return Err(SearchError::InvalidCondition(
                "store query has no node conditions".to_string(),
            ));
        }
        for set in query.node.iter().chain(query.child.iter()) {
            set.validate()?;
        }

        Ok(LoweredQuery {
            node: query.node.iter().map(CompiledSet::compile).collect(),
            child: query.child.as_ref().map(CompiledSet::compile),
            scope: query.scope.clone(),
        })
    }

    fn satisfies(&self, node: &Node, lowered: &LoweredQuery) -> bool {
        if !lowered.scope.admits(&node.record) {
            return false;
        }
        if !lowered.node.iter().all(|set| set.matches(&node.record)) {
            return false;
        }
        match lowered.child {
            Some(ref child_set) => node
                .children
                .iter()
                .filter_map(|id| self.get(id))
                .any(|child| child_set.matches(child)),
            None => true,
        }
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    fn add_page(&mut self, page: ExportPage) {
        let page_id = page.uid.clone().unwrap_or_else(|| page.title.clone());
        if self.nodes.contains_key(&page_id) {
            warn!(page = %page.title, id = %page_id, "Skipping duplicate page");
            return;
        }

        let is_daily = is_daily_title(&page.title);
        let record = NodeRecord {
            id: page_id.clone(),
            content: page.title.clone(),
            container_id: page_id.clone(),
            container_title: page.title.clone(),
            created_at: timestamp(page.create_time),
            modified_at: timestamp(page.edit_time),
            is_container: true,
            is_date_node: is_daily,
            page_refs: Vec::new(),
            block_refs: Vec::new(),
        };
        self.insert(record, None);

        // Pre-order walk; children are pushed reversed so siblings pop in order.
        let mut stack: Vec<(ExportBlock, NodeId)> = page
            .children
            .into_iter()
            .rev()
            .map(|b| (b, page_id.clone()))
            .collect();

        while let Some((block, parent_id)) = stack.pop() {
            let id = match block.uid {
                Some(ref uid) if !self.nodes.contains_key(uid) => uid.clone(),
                Some(ref uid) => {
                    let fresh = uuid::Uuid::new_v4().to_string();
                    warn!(uid = %uid, replacement = %fresh, "Duplicate block uid");
                    fresh
                }
                None => uuid::Uuid::new_v4().to_string(),
            };

            let record = NodeRecord {
                id: id.clone(),
                page_refs: page_ref_titles(&block.string),
                block_refs: parse_block_refs(&block.string),
                content: block.string,
                container_id: page_id.clone(),
                container_title: page.title.clone(),
                created_at: timestamp(block.create_time),
                modified_at: timestamp(block.edit_time),
                is_container: false,
                is_date_node: is_daily,
            };
            self.insert(record, Some(parent_id));

            stack.extend(block.children.into_iter().rev().map(|c| (c, id.clone())));
        }
    }

    fn insert(&mut self, record: NodeRecord, parent: Option<NodeId>) {
        let id = record.id.clone();
        if let Some(ref parent_id) = parent {
            if let Some(parent_node) = self.nodes.get_mut(parent_id) {
                parent_node.children.push(id.clone());
            }
        }
        self.nodes.insert(
            id.clone(),
            Node {
                record,
                parent,
                children: Vec::new(),
            },
        );
        self.order.push(id);
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// Export files under `dir`, sorted by path.
fn export_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for ext in ["json", "yaml", "yml"] {
        let pattern = dir.join(format!("**/*.{}", ext));
        for entry in glob(&pattern.to_string_lossy())? {
            match entry {
                Ok(path) => files.push(path),
                Err(e) => warn!(error = %e, "Glob error while listing export files"),
            }
        }
    }
    files.sort();
    Ok(files)
}

// ============================================================================
// Store contracts
// ============================================================================

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn query(&self, query: &StoreQuery) -> Result<Vec<NodeRecord>> {
        let lowered = Self::lower(query)?;

        let records: Vec<NodeRecord> = self
            .order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| self.satisfies(node, &lowered))
            .map(|node| node.record.clone())
            .collect();

        debug!(
            sets = query.node.len(),
            join = query.child.is_some(),
            hits = records.len(),
            "Memory graph query"
        );
        Ok(records)
    }
}

#[async_trait]
impl HierarchyReader for MemoryGraph {
    async fn descendants(
        &self,
        ids: &[NodeId],
        depth: usize,
    ) -> Result<HashMap<NodeId, Vec<HierarchyEntry>>> {
        let mut out = HashMap::with_capacity(ids.len());

        for root in ids {
            let mut entries = Vec::new();
            let mut queue: VecDeque<(&NodeId, usize)> = VecDeque::new();
            queue.push_back((root, 0));

            while let Some((id, level)) = queue.pop_front() {
                if level >= depth {
                    continue;
                }
                let Some(node) = self.nodes.get(id) else {
                    continue;
                };
                for child_id in &node.children {
                    if let Some(child) = self.nodes.get(child_id) {
                        entries.push(HierarchyEntry {
                            record: child.record.clone(),
                            level: level + 1,
                            parent_id: id.clone(),
                        });
                        queue.push_back((child_id, level + 1));
                    }
                }
            }

            out.insert(root.clone(), entries);
        }

        Ok(out)
    }

    async fn ancestors(
        &self,
        ids: &[NodeId],
        depth: usize,
    ) -> Result<HashMap<NodeId, Vec<NodeRecord>>> {
        let mut out = HashMap::with_capacity(ids.len());

        for id in ids {
            let mut chain = Vec::new();
            let mut seen = HashSet::new();
            let mut current = self.nodes.get(id).and_then(|n| n.parent.as_ref());

            while let Some(parent_id) = current {
                if chain.len() >= depth || !seen.insert(parent_id) {
                    break;
                }
                let Some(parent) = self.nodes.get(parent_id) else {
                    break;
                };
                chain.push(parent.record.clone());
                current = parent.parent.as_ref();
            }

            out.insert(id.clone(), chain);
        }

        Ok(out)
    }
}
