//! Operator strategies.
//!
//! | Operator | Branches                                  | Merge          |
//! |----------|-------------------------------------------|----------------|
//! | `>`      | join: L with a direct child matching R    | join result    |
//! | `>>`     | L, then descendants evaluated against R   | filter         |
//! | `=>`     | same node, `>>` at max depth              | prioritized    |
//! | `<=>`    | same node, `>` L to R, `>` R to L         | bidirectional  |
//! | `<<=>>`  | same node, `>>` L to R, `>>` R to L       | bidirectional  |
//!
//! Single-branch operators propagate store errors. In multi-branch operators
//! a failed branch contributes nothing and is reported as a warning, unless
//! every branch failed.

use crate::condition::ConditionSet;
use crate::engine::Invocation;
use crate::engine::merge::{Hit, merge_bidirectional, merge_prioritized};
use crate::engine::progress::ProgressEvent;
use crate::error::Result;
use crate::search::matcher::CompiledSet;
use crate::search::types::HierOperator;
use crate::store::StoreQuery;
use crate::types::{NodeId, NodeRecord};
use std::future::Future;
use tracing::{debug, warn};

/// Run `operator` over two prepared condition sets.
pub(crate) async fn execute(
    inv: &Invocation<'_>,
    operator: HierOperator,
    left: &ConditionSet,
    right: &ConditionSet,
    max_depth: usize,
) -> Result<Vec<Hit>> {
    let lvl = if operator.is_deep() { max_depth } else { 1 };
    debug!(invocation_id = %inv.id, %operator, lvl, "Executing strategy");

    let hits = match operator {
        HierOperator::Strict => branch(inv, "strict", strict(inv, left, right)).await?,

        HierOperator::DeepStrict => branch(inv, "deep", deep(inv, left, right, lvl)).await?,

        HierOperator::Flexible => {
            let (same, forward) = tokio::join!(
                branch(inv, "same_node", same_node(inv, left, right)),
                branch(inv, "forward", deep(inv, left, right, max_depth)),
            );
            let branches = recover(inv, vec![("same_node".into(), same), ("forward".into(), forward)])?;
            merge_prioritized(branches)
        }

        HierOperator::Bidirectional => {
            let (same, forward, reverse) = tokio::join!(
                branch(inv, "same_node", same_node(inv, left, right)),
                branch(inv, "forward", strict(inv, left, right)),
                branch(inv, "reverse", strict(inv, right, left)),
            );
            bidirectional(inv, same, forward, reverse)?
        }

        HierOperator::DeepBidirectional => {
            let (same, forward, reverse) = tokio::join!(
                branch(inv, "same_node", same_node(inv, left, right)),
                branch(inv, "forward", deep(inv, left, right, lvl)),
                branch(inv, "reverse", deep(inv, right, left, lvl)),
            );
            bidirectional(inv, same, forward, reverse)?
        }
    };

    debug!(invocation_id = %inv.id, %operator, hits = hits.len(), "Strategy finished");
    Ok(hits)
}

/// A plain flat search as a single required branch.
pub(crate) async fn flat(inv: &Invocation<'_>, set: &ConditionSet) -> Result<Vec<Hit>> {
    branch(inv, "flat", async {
        let records = inv
            .flat
            .query(&StoreQuery::matching(set.clone(), inv.scope.clone()))
            .await?;
        Ok(records.into_iter().map(Hit::bare).collect())
    })
    .await
}

fn bidirectional(
    inv: &Invocation<'_>,
    same: Result<Vec<Hit>>,
    forward: Result<Vec<Hit>>,
    reverse: Result<Vec<Hit>>,
) -> Result<Vec<Hit>> {
    let mut branches = recover(
        inv,
        vec![
            ("same_node".into(), same),
            ("forward".into(), forward),
            ("reverse".into(), reverse),
        ],
    )?
    .into_iter();

    let same = branches.next().unwrap_or_default();
    let forward = branches.next().unwrap_or_default();
    let reverse = branches.next().unwrap_or_default();
    Ok(merge_bidirectional(same, forward, reverse))
}

// ============================================================================
// Branches
// ============================================================================

/// Nodes matching both sides.
async fn same_node(inv: &Invocation<'_>, left: &ConditionSet, right: &ConditionSet) -> Result<Vec<Hit>> {
    let query = StoreQuery::all_of(vec![left.clone(), right.clone()], inv.scope.clone());
    let records = inv.flat.query(&query).await?;
    Ok(records.into_iter().map(Hit::bare).collect())
}

/// Nodes matching `parent` with a direct child matching `child`.
async fn strict(inv: &Invocation<'_>, parent: &ConditionSet, child: &ConditionSet) -> Result<Vec<Hit>> {
    let query = StoreQuery::with_child(parent.clone(), child.clone(), inv.scope.clone());
    let records = inv.flat.query(&query).await?;
    annotate(inv, records, child, 1).await
}

/// Nodes matching `ancestor` with a descendant within `depth` levels matching `descendant`.
async fn deep(
    inv: &Invocation<'_>,
    ancestor: &ConditionSet,
    descendant: &ConditionSet,
    depth: usize,
) -> Result<Vec<Hit>> {
    let query = StoreQuery::matching(ancestor.clone(), inv.scope.clone());
    let records = inv.flat.query(&query).await?;
    let hits = annotate(inv, records, descendant, depth).await?;
    Ok(hits.into_iter().filter(|hit| !hit.covered.is_empty()).collect())
}

/// Fill `covered` and `subtree` for each record with one batched lookup.
async fn annotate(
    inv: &Invocation<'_>,
    records: Vec<NodeRecord>,
    other: &ConditionSet,
    depth: usize,
) -> Result<Vec<Hit>> {
    let ids: Vec<NodeId> = records.iter().map(|r| r.id.clone()).collect();
    let tree = inv.hierarchy.descendants(&ids, depth).await?;
    let compiled = CompiledSet::compile(other);

    Ok(records
        .into_iter()
        .map(|record| {
            let mut hit = Hit::bare(record);
            for entry in tree.get(&hit.record.id).into_iter().flatten() {
                hit.subtree.insert(entry.record.id.clone());
                if compiled.matches(&entry.record) {
                    hit.covered.insert(entry.record.id.clone());
                }
            }
            hit
        })
        .collect())
}

// ============================================================================
// Branch bookkeeping
// ============================================================================

/// Run one branch, reporting its start and outcome.
pub(crate) async fn branch<T, F>(inv: &Invocation<'_>, name: &str, work: F) -> Result<Vec<T>>
where
    F: Future<Output = Result<Vec<T>>>,
{
    inv.progress.emit(ProgressEvent::BranchStarted {
        invocation_id: inv.id,
        branch: name.to_string(),
    });

    let outcome = work.await;
    match outcome {
        Ok(ref items) => inv.progress.emit(ProgressEvent::BranchFinished {
            invocation_id: inv.id,
            branch: name.to_string(),
            count: items.len(),
        }),
        Err(ref e) => inv.progress.emit(ProgressEvent::BranchFailed {
            invocation_id: inv.id,
            branch: name.to_string(),
            error: e.to_string(),
        }),
    }
    outcome
}

/// Replace failed branches with empty results and record warnings.
///
/// Returns the first error when every branch failed.
pub(crate) fn recover<T: Default>(inv: &Invocation<'_>, outcomes: Vec<(String, Result<T>)>) -> Result<Vec<T>> {
    let total = outcomes.len();
    let mut first_error = None;
    let mut failures = Vec::new();
    let mut branches = Vec::with_capacity(total);

    for (name, outcome) in outcomes {
        match outcome {
            Ok(items) => branches.push(items),
            Err(e) => {
                failures.push(format!("Branch '{}' failed: {}", name, e));
                first_error.get_or_insert(e);
                branches.push(T::default());
            }
        }
    }

    if let Some(err) = first_error.filter(|_| failures.len() == total) {
        return Err(err);
    }

    for message in failures {
        warn!(invocation_id = %inv.id, "{}", message);
        inv.flat.warn(message);
    }
    Ok(branches)
}
