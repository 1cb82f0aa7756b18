//! Configuration loaded from `config.toml`.
//!
//! ```toml
//! graph = "~/notes/export.json"
//!
//! [search]
//! limit = 20
//! sort = "recent"
//! children_depth = 2
//! timeout_ms = 5000
//!
//! [synonyms]
//! risk = ["hazard", "threat"]
//! ```

use crate::engine::options::{
    DEFAULT_CHILDREN_DEPTH, DEFAULT_MAX_EXPANSION_TERMS, DEFAULT_PARENTS_DEPTH, QueryOptions,
};
use crate::error::{Result, SearchError};
use crate::store::ExpansionStrategy;
use crate::types::SortMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "NESTSEARCH_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default graph file or directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<PathBuf>,

    #[serde(default)]
    pub search: SearchDefaults,

    /// Term expansion table: term -> related terms.
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
}

/// Defaults for query options; command-line flags override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default)]
    pub sort: SortMode,

    #[serde(default = "default_children_depth")]
    pub children_depth: usize,

    #[serde(default = "default_parents_depth")]
    pub parents_depth: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub expansion: ExpansionStrategy,

    #[serde(default = "default_max_expansion_terms")]
    pub max_expansion_terms: usize,
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

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            limit: None,
            sort: SortMode::default(),
            children_depth: default_children_depth(),
            parents_depth: default_parents_depth(),
            timeout_ms: None,
            expansion: ExpansionStrategy::default(),
            max_expansion_terms: default_max_expansion_terms(),
        }
    }
}

impl Config {
    /// Load from `$NESTSEARCH_CONFIG`, else the user config directory.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| SearchError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Where the config file is looked up.
    pub fn config_path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => dirs::config_dir().map(|d| d.join("nestsearch").join("config.toml")),
        }
    }

    /// Pick the graph path: explicit argument first, then config.
    pub fn resolve_graph_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let path = match (explicit, self.graph.as_deref()) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(path)) => expand_home(path),
            (None, None) => {
                return Err(SearchError::Config(
                    "No graph given; pass --graph or set `graph` in config".to_string(),
                ));
            }
        };

        if !path.exists() {
            return Err(SearchError::GraphNotFound(path));
        }
        Ok(path)
    }

    /// Query options seeded from the `[search]` section.
    pub fn query_options(&self) -> QueryOptions {
        let search = &self.search;
        QueryOptions {
            limit: search.limit,
            sort: search.sort,
            children_depth: search.children_depth,
            parents_depth: search.parents_depth,
            timeout: search.timeout_ms.map(Duration::from_millis),
            expansion_strategy: search.expansion,
            max_expansion_terms: search.max_expansion_terms,
            ..QueryOptions::default()
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
