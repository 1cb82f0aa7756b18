//! nestsearch - hierarchical search over outliner-style note graphs.
//!
//! # Overview
//!
//! Queries describe structural relationships between two sets of nodes:
//!
//! | Operator | Meaning                                                  |
//! |----------|----------------------------------------------------------|
//! | `A > B`      | A is the direct parent of a node matching B          |
//! | `A >> B`     | A is an ancestor of B (default depth 3)              |
//! | `A => B`     | A matches both, or is a parent of B                  |
//! | `A <=> B`    | same node, or either is a direct child of the other  |
//! | `A <<=>> B`  | same node, or either nested in the other (depth 5)   |
//!
//! Operands combine terms with `+` (and) and `|` (or); terms may be plain text,
//! `ref:[[Page]]`, `regex:/pattern/flags` or `ref:((block-uid))`, prefixed with `-`
//! to exclude and suffixed with `~` to expand with related terms.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use nestsearch::{Engine, MemoryGraph, QueryOptions};
//!
//! # async fn demo() -> nestsearch::Result<()> {
//! let graph = Arc::new(MemoryGraph::load(Path::new("export.json"))?);
//! let engine = Engine::from_graph(graph);
//!
//! let output = engine
//!     .run_query("ref:[[Project Alpha]] <=> risk", &QueryOptions::default())
//!     .await?;
//! println!("{} matches", output.total);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod condition;
pub mod config;
pub mod engine;
pub mod error;
pub mod markup;
pub mod search;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use condition::{Condition, ConditionKind, ConditionSet, MatchMode};
pub use config::Config;
pub use engine::{Engine, QueryOptions, combine_many_branches};
pub use error::{Result, SearchError};
pub use search::{Expression, HierOperator, parse, parse_with_depth};
pub use store::{GraphStore, HierarchyReader, MemoryGraph, StoreQuery, SynonymExpander, TermExpander};
pub use types::*;
