//! The query engine.
//!
//! Every entry point runs the same pipeline: strategy branches (concurrent
//! where independent) → merge → enrich with children and parents → rank →
//! truncate → redact. Nothing is shared between invocations.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use nestsearch::engine::{Engine, QueryOptions};
//! use nestsearch::store::MemoryGraph;
//!
//! # async fn run() -> nestsearch::Result<()> {
//! let graph = Arc::new(MemoryGraph::load(Path::new("graph.json"))?);
//! let engine = Engine::from_graph(graph);
//!
//! let output = engine.run_query("risk > mitigation", &QueryOptions::default()).await?;
//! for result in &output.results {
//!     println!("{} ({})", result.id, result.container_title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod flat;
pub mod hierarchy;
pub mod merge;
pub mod options;
pub mod progress;
pub mod rank;
mod strategy;

use crate::condition::{Condition, ConditionSet};
use crate::error::{Result, SearchError};
use crate::search::parser::parse_with_depth;
use crate::search::types::Expression;
use crate::store::{GraphStore, HierarchyReader, MemoryGraph, TermExpander};
use crate::types::{Combine, CombineMode, MatchResult, QueryOutput, Scope};
use flat::FlatSearch;
use hierarchy::HierarchyAdapter;
use merge::Hit;
use progress::{NoProgress, ProgressEvent, ProgressSink};
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

pub use merge::combine_many_branches;
pub use options::QueryOptions;
pub use progress::{ChannelProgress, TracingProgress};

/// State for a single invocation.
pub(crate) struct Invocation<'a> {
    pub id: Uuid,
    pub flat: FlatSearch<'a>,
    pub hierarchy: HierarchyAdapter<'a>,
    pub progress: &'a dyn ProgressSink,
    pub scope: &'a Scope,
}

/// Hierarchical query engine over a graph store.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn GraphStore>,
    hierarchy: Arc<dyn HierarchyReader>,
    expander: Option<Arc<dyn TermExpander>>,
    progress: Arc<dyn ProgressSink>,
}

impl Engine {
    pub fn new(store: Arc<dyn GraphStore>, hierarchy: Arc<dyn HierarchyReader>) -> Self {
        Self {
            store,
            hierarchy,
            expander: None,
            progress: Arc::new(NoProgress),
        }
    }

    /// Use one in-memory graph as both store and hierarchy reader.
    pub fn from_graph(graph: Arc<MemoryGraph>) -> Self {
        Self::new(graph.clone(), graph)
    }

    pub fn with_expander(mut self, expander: Arc<dyn TermExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Flat search over one condition set.
    pub async fn run_simple(
        &self,
        conditions: Vec<Condition>,
        combine: Combine,
        options: &QueryOptions,
    ) -> Result<QueryOutput> {
        let set = ConditionSet::new(conditions, combine);
        set.validate()?;
        let label = describe_set(&set);
        self.with_deadline(options, self.simple(&set, options, &label)).await
    }

    /// Parse and run a query string. `options.max_depth` overrides operator defaults.
    pub async fn run_query(&self, query: &str, options: &QueryOptions) -> Result<QueryOutput> {
        let expression = parse_with_depth(query, options.max_depth)?;
        self.run_hierarchical(&expression, options).await
    }

    /// Run a parsed expression. Without a structural operator this is a simple search.
    pub async fn run_hierarchical(
        &self,
        expression: &Expression,
        options: &QueryOptions,
    ) -> Result<QueryOutput> {
        check_expression(expression)?;
        let label = expression.to_string();

        match expression {
            Expression::Hierarchical { .. } => {
                self.with_deadline(options, self.hierarchical(expression, options, &label))
                    .await
            }
            _ => {
                let set = expression.to_condition_set();
                self.with_deadline(options, self.simple(&set, options, &label)).await
            }
        }
    }

    /// Run several independent expressions concurrently and combine their results.
    ///
    /// A branch whose store calls fail contributes nothing and adds a warning;
    /// the call fails only if every branch failed.
    pub async fn run_composed(
        &self,
        expressions: &[Expression],
        mode: CombineMode,
        options: &QueryOptions,
    ) -> Result<QueryOutput> {
        if expressions.is_empty() {
            return Err(SearchError::parse("No expressions to compose"));
        }
        for expression in expressions {
            check_expression(expression)?;
        }
        let label = expressions
            .iter()
            .map(|e| format!("({})", e))
            .collect::<Vec<_>>()
            .join(match mode {
                CombineMode::Union => " ∪ ",
                CombineMode::Intersection => " ∩ ",
            });

        self.with_deadline(options, self.composed(expressions, mode, options, &label))
            .await
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    async fn with_deadline<F>(&self, options: &QueryOptions, work: F) -> Result<QueryOutput>
    where
        F: Future<Output = Result<QueryOutput>>,
    {
        match options.timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| SearchError::Timeout(limit))?,
            None => work.await,
        }
    }

    fn start<'a>(&'a self, options: &'a QueryOptions, label: &str) -> Invocation<'a> {
        let id = Uuid::new_v4();
        self.progress.emit(ProgressEvent::InvocationStarted {
            invocation_id: id,
            query: label.to_string(),
        });
        Invocation {
            id,
            flat: FlatSearch::new(&*self.store, self.expander.as_deref(), options),
            hierarchy: HierarchyAdapter::new(&*self.hierarchy),
            progress: &*self.progress,
            scope: &options.scope,
        }
    }

    async fn simple(&self, set: &ConditionSet, options: &QueryOptions, label: &str) -> Result<QueryOutput> {
        let inv = self.start(options, label);
        let span = info_span!("invocation", id = %inv.id, query = %label);

        async {
            let expanded = inv.flat.expand_set(set).await;
            let hits = strategy::flat(&inv, &expanded).await?;
            let results = hits_to_results(hits);
            Ok(self.finish(&inv, results, expanded.conditions, options).await)
        }
        .instrument(span)
        .await
    }

    async fn hierarchical(
        &self,
        expression: &Expression,
        options: &QueryOptions,
        label: &str,
    ) -> Result<QueryOutput> {
        let inv = self.start(options, label);
        let span = info_span!("invocation", id = %inv.id, query = %label);

        async {
            let (hits, conditions) = self.branch_hits(&inv, expression, options).await?;
            let results = hits_to_results(hits);
            Ok(self.finish(&inv, results, conditions, options).await)
        }
        .instrument(span)
        .await
    }

    async fn composed(
        &self,
        expressions: &[Expression],
        mode: CombineMode,
        options: &QueryOptions,
        label: &str,
    ) -> Result<QueryOutput> {
        let inv = self.start(options, label);
        let span = info_span!("invocation", id = %inv.id, query = %label);

        async {
            let inv = &inv;
            let outcomes = futures::future::join_all(expressions.iter().enumerate().map(
                |(i, expression)| async move {
                    let name = format!("compose[{}]", i);
                    let outcome = strategy::branch(inv, &name, async {
                        self.branch_hits(inv, expression, options)
                            .await
                            .map(|(hits, _)| hits)
                    })
                    .await;
                    (name, outcome)
                },
            ))
            .await;

            let branches: Vec<Vec<MatchResult>> = strategy::recover(inv, outcomes)?
                .into_iter()
                .map(hits_to_results)
                .collect();
            let combined = combine_many_branches(branches, mode);

            let conditions = expressions
                .iter()
                .flat_map(|e| e.to_condition_set().conditions)
                .collect();
            Ok(self.finish(inv, combined, conditions, options).await)
        }
        .instrument(span)
        .await
    }

    /// Hits for one expression plus the prepared conditions used for ranking.
    async fn branch_hits(
        &self,
        inv: &Invocation<'_>,
        expression: &Expression,
        options: &QueryOptions,
    ) -> Result<(Vec<Hit>, Vec<Condition>)> {
        match expression {
            Expression::Hierarchical {
                operator,
                left,
                right,
                max_depth,
            } => {
                let depth = options.max_depth.unwrap_or(*max_depth);
                let (left, right) = (left.to_condition_set(), right.to_condition_set());
                let (left, right) =
                    tokio::join!(inv.flat.expand_set(&left), inv.flat.expand_set(&right));
                let hits = strategy::execute(inv, *operator, &left, &right, depth).await?;
                let conditions = left.conditions.into_iter().chain(right.conditions).collect();
                Ok((hits, conditions))
            }
            other => {
                let set = inv.flat.expand_set(&other.to_condition_set()).await;
                let hits = strategy::flat(inv, &set).await?;
                Ok((hits, set.conditions))
            }
        }
    }

    /// Enrich, rank, truncate and redact.
    async fn finish(
        &self,
        inv: &Invocation<'_>,
        mut results: Vec<MatchResult>,
        conditions: Vec<Condition>,
        options: &QueryOptions,
    ) -> QueryOutput {
        inv.progress.emit(ProgressEvent::Merged {
            invocation_id: inv.id,
            count: results.len(),
        });

        if let Err(e) = inv
            .hierarchy
            .enrich(&mut results, options.children_depth, options.parents_depth)
            .await
        {
            warn!(invocation_id = %inv.id, error = %e, "Returning results without hierarchy context");
            inv.flat.warn(format!("Result enrichment failed: {}", e));
        }

        rank::rank(&mut results, options.sort, &conditions);

        let total = results.len();
        if let Some(limit) = options.limit {
            results.truncate(limit);
        }
        if options.secure {
            results.iter_mut().for_each(MatchResult::redact);
        }

        debug!(invocation_id = %inv.id, total, returned = results.len(), "Invocation finished");
        QueryOutput {
            results,
            total,
            warnings: inv.flat.take_warnings(),
        }
    }
}

fn hits_to_results(hits: Vec<Hit>) -> Vec<MatchResult> {
    hits.iter().map(|hit| MatchResult::from_record(&hit.record)).collect()
}

/// Reject trees the parser never produces and condition sets that cannot run.
fn check_expression(expression: &Expression) -> Result<()> {
    if let Expression::Hierarchical { left, right, .. } = expression {
        if left.is_hierarchical() || right.is_hierarchical() {
            return Err(SearchError::parse(
                "A hierarchical operand cannot itself be hierarchical",
            ));
        }
        for side in [left, right] {
            side.to_condition_set().validate()?;
            if side.has_mixed_compounds() {
                debug!(operand = %side, "Mixed AND/OR operand flattened to its top-level operator");
            }
        }
        return Ok(());
    }

    if expression.has_mixed_compounds() {
        debug!(query = %expression, "Mixed AND/OR query flattened to its top-level operator");
    }
    expression.to_condition_set().validate()
}

fn describe_set(set: &ConditionSet) -> String {
    let sep = match set.combine {
        Combine::And => " + ",
        Combine::Or => " | ",
    };
    set.conditions
        .iter()
        .map(|c| {
            if c.negate {
                format!("-{}", c.pattern)
            } else {
                c.pattern.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(sep)
}
