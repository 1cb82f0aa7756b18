//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nestsearch")]
#[command(author, version, about = "Hierarchical search over outliner note graphs", long_about = None)]
pub struct Cli {
    /// Graph export file or directory (overrides config default)
    #[arg(long, global = true)]
    pub graph: Option<PathBuf>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Output as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a hierarchical query, e.g. "risk > mitigation"
    Query(QueryArgs),

    /// Flat search over plain conditions
    Search(SearchArgs),

    /// Run several queries and combine their results
    Compose(ComposeArgs),

    /// Print the parsed expression tree of a query
    Parse(ParseArgs),
}

/// Options shared by every search command.
#[derive(Args, Debug, Clone, Default)]
pub struct SearchOptions {
    /// Traversal depth for structural operators
    #[arg(long)]
    pub depth: Option<usize>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Result ordering
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Omit node content from results
    #[arg(long)]
    pub secure: bool,

    /// Expand every text term with related terms
    #[arg(long)]
    pub expand: bool,

    /// Relation used for term expansion
    #[arg(long, value_enum)]
    pub expansion: Option<ExpansionArg>,

    /// Levels of children to attach (0 disables)
    #[arg(long)]
    pub children_depth: Option<usize>,

    /// Levels of parents to attach (0 disables)
    #[arg(long)]
    pub parents_depth: Option<usize>,

    /// Restrict to these node ids (repeatable)
    #[arg(long = "node")]
    pub nodes: Vec<String>,

    /// Restrict to these page ids (repeatable)
    #[arg(long = "page")]
    pub pages: Vec<String>,

    /// Daily-note handling
    #[arg(long, value_enum)]
    pub daily: Option<DailyArg>,

    /// Overall deadline in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Relevance,
    Recent,
    Title,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExpansionArg {
    Synonyms,
    Related,
    Broader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DailyArg {
    Include,
    Exclude,
    Only,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query expression
    pub query: String,

    #[command(flatten)]
    pub options: SearchOptions,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text terms
    pub terms: Vec<String>,

    /// Match any condition instead of all
    #[arg(long)]
    pub any: bool,

    /// Page reference condition (repeatable)
    #[arg(long = "ref")]
    pub refs: Vec<String>,

    /// Regex condition (repeatable)
    #[arg(long = "regex")]
    pub regexes: Vec<String>,

    /// Exclude nodes containing this text (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    #[command(flatten)]
    pub options: SearchOptions,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Query expressions, one branch each
    #[arg(required = true)]
    pub queries: Vec<String>,

    /// Keep only results found by every branch
    #[arg(long)]
    pub intersect: bool,

    #[command(flatten)]
    pub options: SearchOptions,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Query expression
    pub query: String,

    /// Traversal depth for structural operators
    #[arg(long)]
    pub depth: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_args() {
        let cli = Cli::parse_from([
            "nestsearch", "--yaml", "query", "risk > mitigation", "--limit", "5", "--sort", "title",
            "--page", "p1", "--page", "p2", "--daily", "exclude",
        ]);
        assert_eq!(cli.output_format(), OutputFormat::Yaml);
        let Commands::Query(args) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(args.query, "risk > mitigation");
        assert_eq!(args.options.limit, Some(5));
        assert_eq!(args.options.sort, Some(SortArg::Title));
        assert_eq!(args.options.pages, vec!["p1", "p2"]);
        assert_eq!(args.options.daily, Some(DailyArg::Exclude));
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::parse_from([
            "nestsearch", "search", "alpha", "beta", "--any", "--ref", "Project", "--exclude", "draft",
        ]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.terms, vec!["alpha", "beta"]);
        assert!(args.any);
        assert_eq!(args.refs, vec!["Project"]);
        assert_eq!(args.exclude, vec!["draft"]);
    }

    #[test]
    fn test_compose_requires_query() {
        assert!(Cli::try_parse_from(["nestsearch", "compose"]).is_err());
    }

    #[test]
    fn test_output_formats_conflict() {
        assert!(Cli::try_parse_from(["nestsearch", "--json", "--yaml", "parse", "a"]).is_err());
    }
}
