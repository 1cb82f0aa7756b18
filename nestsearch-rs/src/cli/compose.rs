//! `compose` command: several queries combined by union or intersection.

use crate::cli::args::ComposeArgs;
use crate::cli::output::Output;
use crate::cli::print_results;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{ExitCode, Result};
use crate::search::parse_with_depth;
use crate::types::CombineMode;

pub async fn run(engine: &Engine, config: &Config, args: &ComposeArgs, output: &Output) -> Result<ExitCode> {
    let options = args.options.to_query_options(config);
    let expressions = args
        .queries
        .iter()
        .map(|q| parse_with_depth(q, options.max_depth))
        .collect::<Result<Vec<_>>>()?;

    let (mode, sep) = if args.intersect {
        (CombineMode::Intersection, " AND ")
    } else {
        (CombineMode::Union, " OR ")
    };
    let label = expressions
        .iter()
        .map(|e| format!("({})", e))
        .collect::<Vec<_>>()
        .join(sep);

    let result = engine.run_composed(&expressions, mode, &options).await?;
    print_results(label, &result, output)
}
