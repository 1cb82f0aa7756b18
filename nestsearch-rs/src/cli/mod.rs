//! CLI command implementations.

pub mod args;
pub mod output;

pub mod compose;
pub mod parse;
pub mod query;
pub mod search;

pub use args::{Cli, Commands};
pub use output::Output;

use crate::config::Config;
use crate::engine::QueryOptions;
use crate::error::ExitCode;
use crate::error::Result;
use crate::store::ExpansionStrategy;
use crate::types::{DateNodeFilter, QueryOutput, Scope, SortMode};
use args::{DailyArg, ExpansionArg, SearchOptions, SortArg};
use serde::Serialize;
use std::time::Duration;

/// Response printed by the search commands.
#[derive(Debug, Serialize)]
pub struct SearchResponse<'a> {
    pub query: String,
    pub total: usize,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub warnings: &'a [String],
    pub results: &'a [crate::types::MatchResult],
}

impl SearchOptions {
    /// Merge flags over the config's `[search]` defaults.
    pub fn to_query_options(&self, config: &Config) -> QueryOptions {
        let mut options = config.query_options();

        options.max_depth = self.depth;
        if self.limit.is_some() {
            options.limit = self.limit;
        }
        if let Some(sort) = self.sort {
            options.sort = match sort {
                SortArg::Relevance => SortMode::Relevance,
                SortArg::Recent => SortMode::Recent,
                SortArg::Title => SortMode::ContainerTitle,
                SortArg::Depth => SortMode::HierarchyDepth,
            };
        }
        if let Some(expansion) = self.expansion {
            options.expansion_strategy = match expansion {
                ExpansionArg::Synonyms => ExpansionStrategy::Synonyms,
                ExpansionArg::Related => ExpansionStrategy::Related,
                ExpansionArg::Broader => ExpansionStrategy::Broader,
            };
        }
        if let Some(depth) = self.children_depth {
            options.children_depth = depth;
        }
        if let Some(depth) = self.parents_depth {
            options.parents_depth = depth;
        }
        if let Some(ms) = self.timeout {
            options.timeout = Some(Duration::from_millis(ms));
        }
        options.secure = self.secure;
        options.expand_all = self.expand;

        options.scope = Scope {
            node_ids: (!self.nodes.is_empty()).then(|| self.nodes.iter().cloned().collect()),
            container_ids: (!self.pages.is_empty()).then(|| self.pages.iter().cloned().collect()),
            date_nodes: match self.daily {
                Some(DailyArg::Exclude) => DateNodeFilter::Exclude,
                Some(DailyArg::Only) => DateNodeFilter::Only,
                Some(DailyArg::Include) | None => DateNodeFilter::Include,
            },
        };

        options
    }
}

/// Print warnings and results; an empty result set maps to `NoResults`.
pub fn print_results(query: String, result: &QueryOutput, output: &Output) -> Result<ExitCode> {
    for warning in &result.warnings {
        output.warn(warning);
    }

    output.print(&SearchResponse {
        query,
        total: result.total,
        warnings: &result.warnings,
        results: &result.results,
    })?;

    Ok(if result.results.is_empty() {
        ExitCode::NoResults
    } else {
        ExitCode::Success
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn options(argv: &[&str]) -> SearchOptions {
        let mut full = vec!["nestsearch", "query", "x"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Query(args) => args.options,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config::from_toml_str("[search]\nlimit = 50\nchildren_depth = 4\nsort = \"recent\"").unwrap();

        let opts = options(&["--limit", "3", "--sort", "depth", "--timeout", "250"]).to_query_options(&config);
        assert_eq!(opts.limit, Some(3));
        assert_eq!(opts.sort, SortMode::HierarchyDepth);
        assert_eq!(opts.children_depth, 4);
        assert_eq!(opts.timeout, Some(Duration::from_millis(250)));

        let opts = options(&[]).to_query_options(&config);
        assert_eq!(opts.limit, Some(50));
        assert_eq!(opts.sort, SortMode::Recent);
    }

    #[test]
    fn test_scope_flags() {
        let opts = options(&["--node", "a", "--daily", "only", "--secure"]).to_query_options(&Config::default());
        assert_eq!(opts.scope.node_ids.as_ref().map(|s| s.len()), Some(1));
        assert!(opts.scope.container_ids.is_none());
        assert_eq!(opts.scope.date_nodes, DateNodeFilter::Only);
        assert!(opts.secure);
    }
}
