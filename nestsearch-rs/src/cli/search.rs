//! `search` command: flat search over plain conditions.

use crate::cli::args::SearchArgs;
use crate::cli::output::Output;
use crate::cli::print_results;
use crate::condition::Condition;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{ExitCode, Result};
use crate::search::parser::parse_regex_body;
use crate::types::Combine;

/// Conditions in flag order: terms, page refs, regexes, exclusions.
pub fn build_conditions(args: &SearchArgs) -> Result<Vec<Condition>> {
    let mut conditions: Vec<Condition> = args.terms.iter().map(Condition::text).collect();
    conditions.extend(args.refs.iter().map(Condition::page_ref));

    for raw in &args.regexes {
        let (pattern, flags) = parse_regex_body(raw)?;
        conditions.push(Condition::regex(pattern, flags.as_deref()));
    }

    conditions.extend(args.exclude.iter().map(|t| Condition::text(t).negated()));
    Ok(conditions)
}

pub async fn run(engine: &Engine, config: &Config, args: &SearchArgs, output: &Output) -> Result<ExitCode> {
    let options = args.options.to_query_options(config);
    let conditions = build_conditions(args)?;
    let combine = if args.any { Combine::Or } else { Combine::And };

    let label = conditions
        .iter()
        .map(|c| c.pattern.as_str())
        .collect::<Vec<_>>()
        .join(if args.any { " | " } else { " + " });

    let result = engine.run_simple(conditions, combine, &options).await?;
    print_results(label, &result, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{Cli, Commands};
    use crate::condition::ConditionKind;
    use clap::Parser;

    #[test]
    fn test_build_conditions() {
        let cli = Cli::parse_from([
            "nestsearch", "search", "risk", "--ref", "Vendor", "--regex", "/^todo/i", "--exclude", "draft",
        ]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };

        let conditions = build_conditions(&args).unwrap();
        let kinds: Vec<ConditionKind> = conditions.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ConditionKind::Text, ConditionKind::PageRef, ConditionKind::Regex, ConditionKind::Text]
        );
        assert_eq!(conditions[2].pattern, "^todo");
        assert_eq!(conditions[2].regex_flags.as_deref(), Some("i"));
        assert!(conditions[3].negate);
    }
}
