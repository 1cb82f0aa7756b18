//! Flat search: one store query per condition set, with optional term expansion.

use crate::condition::{Condition, ConditionKind, ConditionSet};
use crate::engine::options::QueryOptions;
use crate::error::{Result, SearchError};
use crate::store::{ExpansionStrategy, GraphStore, StoreQuery, TermExpander};
use crate::types::{NodeRecord, Scope};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Flat search executor for a single invocation.
///
/// Expansion results are cached for the lifetime of this value, which is one
/// invocation. Recovered failures accumulate as warnings.
pub struct FlatSearch<'a> {
    store: &'a dyn GraphStore,
    expander: Option<&'a dyn TermExpander>,
    strategy: ExpansionStrategy,
    max_terms: usize,
    expand_all: bool,
    cache: Mutex<HashMap<String, Vec<String>>>,
    warnings: Mutex<Vec<String>>,
}

impl<'a> FlatSearch<'a> {
    pub fn new(
        store: &'a dyn GraphStore,
        expander: Option<&'a dyn TermExpander>,
        options: &QueryOptions,
    ) -> Self {
        Self {
            store,
            expander,
            strategy: options.expansion_strategy,
            max_terms: options.max_expansion_terms,
            expand_all: options.expand_all,
            cache: Mutex::new(HashMap::new()),
            warnings: Mutex::new(Vec::new()),
        }
    }

    /// Expand `set` and run it as a single store query.
    pub async fn search(&self, set: &ConditionSet, scope: &Scope) -> Result<Vec<NodeRecord>> {
        let expanded = self.expand_set(set).await;
        self.query(&StoreQuery::matching(expanded, scope.clone())).await
    }

    /// Run an already-prepared query. Exactly one store call.
    pub async fn query(&self, query: &StoreQuery) -> Result<Vec<NodeRecord>> {
        let records = self.store.query(query).await?;
        debug!(hits = records.len(), join = query.child.is_some(), "Flat search");
        Ok(records)
    }

    /// Attach expansion alternatives to every condition that asks for them.
    pub async fn expand_set(&self, set: &ConditionSet) -> ConditionSet {
        let mut expanded = set.clone();
        for condition in &mut expanded.conditions {
            if self.wants_expansion(condition) {
                self.expand_condition(condition).await;
            }
        }
        expanded
    }

    fn wants_expansion(&self, condition: &Condition) -> bool {
        let expandable = matches!(condition.kind, ConditionKind::Text | ConditionKind::PageRef);
        if condition.expand && !expandable {
            debug!(pattern = %condition.pattern, kind = ?condition.kind, "Condition kind is not expandable");
        }
        expandable
            && (condition.expand
                || (self.expand_all && condition.kind == ConditionKind::Text && !condition.negate))
    }

    async fn expand_condition(&self, condition: &mut Condition) {
        let Some(expander) = self.expander else {
            debug!(pattern = %condition.pattern, "No term expander configured");
            return;
        };

        let key = condition.pattern.trim().to_lowercase();
        let cached = self.lock_cache().get(&key).cloned();
        let terms = match cached {
            Some(terms) => terms,
            None => {
                let terms = match expander
                    .expand(&condition.pattern, self.strategy, self.max_terms)
                    .await
                {
                    Ok(terms) => terms,
                    Err(e) => {
                        let err = match e {
                            SearchError::Expansion { .. } => e,
                            other => SearchError::Expansion {
                                term: condition.pattern.clone(),
                                message: other.to_string(),
                            },
                        };
                        warn!(error = %err, "Continuing without expansion");
                        self.warn(err.to_string());
                        Vec::new()
                    }
                };
                self.lock_cache().insert(key, terms.clone());
                terms
            }
        };

        for term in terms {
            let duplicate = term.eq_ignore_ascii_case(&condition.pattern)
                || condition
                    .alternatives
                    .iter()
                    .any(|a| a.pattern.eq_ignore_ascii_case(&term));
            if !duplicate {
                let alternative = condition.alternative(term);
                condition.alternatives.push(alternative);
            }
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<String>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a recovered failure.
    pub fn warn(&self, message: impl Into<String>) {
        self.warnings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.into());
    }

    /// Drain the recorded warnings.
    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.warnings.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryGraph, SynonymExpander};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExpander {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TermExpander for CountingExpander {
        async fn expand(&self, _term: &str, _s: ExpansionStrategy, _max: usize) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SearchError::Other("service unavailable".to_string()))
            } else {
                Ok(vec!["hazard".to_string()])
            }
        }
    }

    fn graph() -> MemoryGraph {
        MemoryGraph::from_json_str(
            r#"[{"title": "P", "children": [
                {"string": "fire hazard", "uid": "h1"},
                {"string": "project risk", "uid": "r1"}
            ]}]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_expansion_adds_weighted_alternative() {
        let g = graph();
        let expander = CountingExpander { calls: AtomicUsize::new(0), fail: false };
        let flat = FlatSearch::new(&g, Some(&expander), &QueryOptions::default());

        let set = ConditionSet::all(vec![Condition::text("risk").expanded()]);
        let expanded = flat.expand_set(&set).await;
        let alt = &expanded.conditions[0].alternatives[0];
        assert_eq!(alt.pattern, "hazard");
        assert!((alt.weight - 0.8).abs() < 1e-9);

        let hits = flat.search(&set, &Scope::all()).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["h1", "r1"]);
    }

    #[tokio::test]
    async fn test_expansion_cached_per_invocation() {
        let g = graph();
        let expander = CountingExpander { calls: AtomicUsize::new(0), fail: false };
        let flat = FlatSearch::new(&g, Some(&expander), &QueryOptions::default());

        let set = ConditionSet::all(vec![Condition::text("risk").expanded()]);
        flat.expand_set(&set).await;
        flat.expand_set(&set).await;
        assert_eq!(expander.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expansion_failure_recovered() {
        let g = graph();
        let expander = CountingExpander { calls: AtomicUsize::new(0), fail: true };
        let flat = FlatSearch::new(&g, Some(&expander), &QueryOptions::default());

        let set = ConditionSet::all(vec![Condition::text("risk").expanded()]);
        let hits = flat.search(&set, &Scope::all()).await.unwrap();
        assert_eq!(hits.len(), 1);

        let warnings = flat.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("risk"));
        assert!(flat.take_warnings().is_empty());
    }

    #[tokio::test]
    async fn test_expand_all_skips_negated_and_regex() {
        let g = graph();
        let mut table = HashMap::new();
        table.insert("risk".to_string(), vec!["hazard".to_string()]);
        table.insert("draft".to_string(), vec!["wip".to_string()]);
        let expander = SynonymExpander::new(&table);
        let options = QueryOptions {
            expand_all: true,
            ..QueryOptions::default()
        };
        let flat = FlatSearch::new(&g, Some(&expander), &options);

        let set = ConditionSet::all(vec![
            Condition::text("risk"),
            Condition::text("draft").negated(),
            Condition::regex("risk", None),
        ]);
        let expanded = flat.expand_set(&set).await;
        assert_eq!(expanded.conditions[0].alternatives.len(), 1);
        assert!(expanded.conditions[1].alternatives.is_empty());
        assert!(expanded.conditions[2].alternatives.is_empty());
    }

    #[tokio::test]
    async fn test_no_expander_is_noop() {
        let g = graph();
        let flat = FlatSearch::new(&g, None, &QueryOptions::default());
        let set = ConditionSet::all(vec![Condition::text("risk").expanded()]);
        assert_eq!(flat.expand_set(&set).await, set);
    }
}
