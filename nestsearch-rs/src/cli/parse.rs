//! `parse` command: show how a query is understood.

use crate::cli::args::ParseArgs;
use crate::cli::output::Output;
use crate::error::{ExitCode, Result};
use crate::search::{Expression, parse_with_depth};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub query: String,
    /// The expression rendered back into query syntax.
    pub canonical: String,
    pub expression: Expression,
}

pub fn run(args: &ParseArgs, output: &Output) -> Result<ExitCode> {
    let expression = parse_with_depth(&args.query, args.depth)?;
    output.print(&ParseResponse {
        query: args.query.clone(),
        canonical: expression.to_string(),
        expression,
    })?;
    Ok(ExitCode::Success)
}
