//! Error types and exit codes for nestsearch.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit codes returned by the `nestsearch` binary.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const PARSE_ERROR: i32 = 2;
    pub const STORE_ERROR: i32 = 3;
    pub const TIMEOUT: i32 = 4;
    pub const GRAPH_NOT_FOUND: i32 = 5;
    pub const NO_RESULTS: i32 = 10;
}

/// Main error type for nestsearch operations.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Term expansion failed for '{term}': {message}")]
    Expansion { term: String, message: String },

    #[error("Invalid regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Graph not found at: {0}")]
    GraphNotFound(PathBuf),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SearchError::Parse(_) | SearchError::InvalidCondition(_) => exit_code::PARSE_ERROR,
            SearchError::Store(_) => exit_code::STORE_ERROR,
            SearchError::Timeout(_) => exit_code::TIMEOUT,
            SearchError::GraphNotFound(_) => exit_code::GRAPH_NOT_FOUND,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Shorthand for a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        SearchError::Parse(message.into())
    }
}

/// Result type alias for nestsearch operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    ParseError,
    StoreError,
    Timeout,
    GraphNotFound,
    NoResults,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::GeneralError => exit_code::GENERAL_ERROR,
            ExitCode::ParseError => exit_code::PARSE_ERROR,
            ExitCode::StoreError => exit_code::STORE_ERROR,
            ExitCode::Timeout => exit_code::TIMEOUT,
            ExitCode::GraphNotFound => exit_code::GRAPH_NOT_FOUND,
            ExitCode::NoResults => exit_code::NO_RESULTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_class() {
        assert_eq!(SearchError::parse("x").exit_code(), exit_code::PARSE_ERROR);
        assert_eq!(
            SearchError::Store("down".to_string()).exit_code(),
            exit_code::STORE_ERROR
        );
        assert_eq!(
            SearchError::Timeout(Duration::from_secs(1)).exit_code(),
            exit_code::TIMEOUT
        );
        assert_eq!(
            SearchError::Other("x".to_string()).exit_code(),
            exit_code::GENERAL_ERROR
        );
    }

    #[test]
    fn test_error_display() {
        let err = SearchError::Expansion {
            term: "risk".to_string(),
            message: "service unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Term expansion failed for 'risk': service unavailable"
        );
    }
}
