//! The hierarchical query language: expression tree, parser and matcher.

pub mod matcher;
pub mod parser;
pub mod types;

pub use matcher::{CompiledCondition, CompiledSet, MatchQuality, match_quality, normalize};
pub use parser::{parse, parse_with_depth};
pub use types::*;
