//! `query` command: run one hierarchical query.

use crate::cli::args::QueryArgs;
use crate::cli::output::Output;
use crate::cli::print_results;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{ExitCode, Result};
use crate::search::parse_with_depth;

pub async fn run(engine: &Engine, config: &Config, args: &QueryArgs, output: &Output) -> Result<ExitCode> {
    let options = args.options.to_query_options(config);
    let expression = parse_with_depth(&args.query, options.max_depth)?;

    let result = engine.run_hierarchical(&expression, &options).await?;
    print_results(expression.to_string(), &result, output)
}
