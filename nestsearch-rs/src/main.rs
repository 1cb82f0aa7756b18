//! nestsearch CLI entry point.

use clap::Parser;
use nestsearch::cli::args::{Cli, Commands};
use nestsearch::cli::output::Output;
use nestsearch::cli::{compose, parse, query, search};
use nestsearch::config::Config;
use nestsearch::engine::{Engine, TracingProgress};
use nestsearch::error::{ExitCode as SearchExitCode, SearchError};
use nestsearch::store::{MemoryGraph, SynonymExpander};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// `RUST_LOG` wins; otherwise verbosity comes from `-v` (warn, info, debug, trace).
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nestsearch={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<SearchExitCode, SearchError> {
    let output = Output::new(cli.output_format(), cli.quiet);

    // Parsing needs neither config nor graph.
    if let Commands::Parse(args) = &cli.command {
        return parse::run(args, &output);
    }

    let config = Config::load()?;
    let graph_path = config.resolve_graph_path(cli.graph.as_deref())?;
    let graph = Arc::new(MemoryGraph::load(&graph_path)?);

    let mut engine = Engine::from_graph(graph).with_progress(Arc::new(TracingProgress));
    if !config.synonyms.is_empty() {
        engine = engine.with_expander(Arc::new(SynonymExpander::new(&config.synonyms)));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match &cli.command {
            Commands::Query(args) => query::run(&engine, &config, args, &output).await,
            Commands::Search(args) => search::run(&engine, &config, args, &output).await,
            Commands::Compose(args) => compose::run(&engine, &config, args, &output).await,
            Commands::Parse(args) => parse::run(args, &output),
        }
    })
}
