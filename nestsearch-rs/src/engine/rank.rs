//! Relevance ranking.

use crate::condition::Condition;
use crate::search::matcher::{MatchQuality, match_quality, normalize};
use crate::types::{MatchResult, SortMode, newest_first};
use std::cmp::Ordering;

const EXACT_SCORE: f64 = 10.0;
const WHOLE_WORD_SCORE: f64 = 5.0;
const SUBSTRING_SCORE: f64 = 2.0;
const DEPTH_SCORE: f64 = 0.5;
const CONTEXT_BONUS: f64 = 1.0;

fn quality_score(quality: MatchQuality) -> f64 {
    match quality {
        MatchQuality::Exact => EXACT_SCORE,
        MatchQuality::WholeWord => WHOLE_WORD_SCORE,
        MatchQuality::Substring => SUBSTRING_SCORE,
        MatchQuality::None => 0.0,
    }
}

/// Best text score of one condition (or one of its alternatives) against content.
fn condition_score(content: &str, condition: &Condition) -> f64 {
    std::iter::once(condition)
        .chain(condition.alternatives.iter())
        .map(|c| quality_score(match_quality(content, &c.pattern)) * c.weight)
        .fold(0.0, f64::max)
}

/// Relevance score of a result.
pub fn relevance(result: &MatchResult, conditions: &[Condition]) -> f64 {
    let content = normalize(result.content.as_deref().unwrap_or(""));

    let text: f64 = conditions
        .iter()
        .filter(|c| c.is_scored_text())
        .map(|c| condition_score(&content, c))
        .sum();

    let context = if !result.children.is_empty() && !result.parents.is_empty() {
        CONTEXT_BONUS
    } else {
        0.0
    };

    text + DEPTH_SCORE * result.hierarchy_depth as f64 + context
}

/// Sort results in place. The sort is stable.
pub fn rank(results: &mut [MatchResult], sort: SortMode, conditions: &[Condition]) {
    match sort {
        SortMode::Recent => results.sort_by(|a, b| newest_first(a.modified_at, b.modified_at)),
        SortMode::ContainerTitle => results.sort_by_cached_key(|r| r.container_title.to_lowercase()),
        SortMode::HierarchyDepth => results.sort_by(|a, b| b.hierarchy_depth.cmp(&a.hierarchy_depth)),
        SortMode::Relevance => {
            let mut scored: Vec<(f64, MatchResult)> = results
                .iter()
                .map(|r| (relevance(r, conditions), r.clone()))
                .collect();
            scored.sort_by(|(sa, a), (sb, b)| {
                sb.partial_cmp(sa)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| newest_first(a.modified_at, b.modified_at))
            });
            for (slot, (_, result)) in results.iter_mut().zip(scored) {
                *slot = result;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeRecord;
    use chrono::DateTime;

    fn result(id: &str, content: &str) -> MatchResult {
        MatchResult::from_record(&NodeRecord {
            id: id.to_string(),
            content: content.to_string(),
            container_id: "p".to_string(),
            container_title: "P".to_string(),
            created_at: None,
            modified_at: None,
            is_container: false,
            is_date_node: false,
            page_refs: Vec::new(),
            block_refs: Vec::new(),
        })
    }

    fn order(results: &[MatchResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_exact_beats_substring() {
        let conditions = vec![Condition::text("x")];
        let mut results = vec![result("b", "xylophone"), result("a", "x")];

        assert_eq!(relevance(&results[1], &conditions), 10.0);
        assert_eq!(relevance(&results[0], &conditions), 2.0);

        rank(&mut results, SortMode::Relevance, &conditions);
        assert_eq!(order(&results), vec!["a", "b"]);
    }

    #[test]
    fn test_whole_word_and_weights() {
        let conditions = vec![Condition::text("risk").with_weight(2.0)];
        assert_eq!(relevance(&result("a", "a risk here"), &conditions), 10.0);
    }

    #[test]
    fn test_alternative_scores_best() {
        let mut c = Condition::text("risk");
        c.alternatives.push(c.alternative("hazard"));
        // Exact via the alternative: 10 * 0.8
        assert!((relevance(&result("a", "hazard"), &[c]) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_negated_and_non_text_ignored() {
        let conditions = vec![Condition::text("x").negated(), Condition::page_ref("x")];
        assert_eq!(relevance(&result("a", "x"), &conditions), 0.0);
    }

    #[test]
    fn test_structure_bonus() {
        let mut r = result("a", "nothing");
        r.children.push(result("c", "child"));
        r.parents.push(result("p", "parent"));
        r.compute_depth();
        assert_eq!(relevance(&r, &[]), 1.5);
    }

    #[test]
    fn test_ties_newest_first_and_stable() {
        let mut old = result("old", "x");
        old.modified_at = DateTime::from_timestamp_millis(1_000);
        let mut new = result("new", "x");
        new.modified_at = DateTime::from_timestamp_millis(2_000);
        let none_a = result("none_a", "x");
        let none_b = result("none_b", "x");

        let mut results = vec![none_a, old, none_b, new];
        rank(&mut results, SortMode::Relevance, &[Condition::text("x")]);
        assert_eq!(order(&results), vec!["new", "old", "none_a", "none_b"]);
    }

    #[test]
    fn test_other_sort_modes() {
        let mut a = result("a", "a");
        a.container_title = "beta".to_string();
        a.hierarchy_depth = 1;
        let mut b = result("b", "b");
        b.container_title = "Alpha".to_string();
        b.hierarchy_depth = 3;
        b.modified_at = DateTime::from_timestamp_millis(5);

        let mut results = vec![a.clone(), b.clone()];
        rank(&mut results, SortMode::ContainerTitle, &[]);
        assert_eq!(order(&results), vec!["b", "a"]);

        let mut results = vec![a.clone(), b.clone()];
        rank(&mut results, SortMode::HierarchyDepth, &[]);
        assert_eq!(order(&results), vec!["b", "a"]);

        let mut results = vec![a, b];
        rank(&mut results, SortMode::Recent, &[]);
        assert_eq!(order(&results), vec!["b", "a"]);
    }
}
