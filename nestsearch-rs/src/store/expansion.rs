//! Term expansion from a configured synonym table.

use crate::error::Result;
use crate::store::{ExpansionStrategy, TermExpander};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Expands terms from a `term -> [related terms]` table.
///
/// - `synonyms`: the table entry for the term
/// - `related`: the entry plus the entries of each synonym (two hops)
/// - `broader`: terms whose entry lists this term
///
/// Lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct SynonymExpander {
    table: HashMap<String, Vec<String>>,
}

impl SynonymExpander {
    pub fn new(table: &HashMap<String, Vec<String>>) -> Self {
        let table = table
            .iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
            .collect();
        Self { table }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn direct(&self, term: &str) -> &[String] {
        self.table.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    fn candidates(&self, term: &str, strategy: ExpansionStrategy) -> Vec<String> {
        match strategy {
            ExpansionStrategy::Synonyms => self.direct(term).to_vec(),
            ExpansionStrategy::Related => {
                let mut out = self.direct(term).to_vec();
                for synonym in self.direct(term) {
                    out.extend(self.direct(&synonym.to_lowercase()).iter().cloned());
                }
                out
            }
            ExpansionStrategy::Broader => {
                let mut keys: Vec<&String> = self
                    .table
                    .iter()
                    .filter(|(_, values)| values.iter().any(|v| v.to_lowercase() == term))
                    .map(|(key, _)| key)
                    .collect();
                keys.sort();
                keys.into_iter().cloned().collect()
            }
        }
    }
}

#[async_trait]
impl TermExpander for SynonymExpander {
    async fn expand(
        &self,
        term: &str,
        strategy: ExpansionStrategy,
        max_terms: usize,
    ) -> Result<Vec<String>> {
        let key = term.trim().to_lowercase();
        let mut seen = HashSet::from([key.clone()]);

        Ok(self
            .candidates(&key, strategy)
            .into_iter()
            .filter(|t| !t.trim().is_empty() && seen.insert(t.trim().to_lowercase()))
            .take(max_terms)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expander() -> SynonymExpander {
        let mut table = HashMap::new();
        table.insert(
            "Risk".to_string(),
            vec!["hazard".to_string(), "threat".to_string(), "risk".to_string()],
        );
        table.insert("hazard".to_string(), vec!["danger".to_string()]);
        table.insert("project".to_string(), vec!["initiative".to_string()]);
        SynonymExpander::new(&table)
    }

    #[tokio::test]
    async fn test_synonyms_exclude_original() {
        let terms = expander()
            .expand("risk", ExpansionStrategy::Synonyms, 5)
            .await
            .unwrap();
        assert_eq!(terms, vec!["hazard", "threat"]);
    }

    #[tokio::test]
    async fn test_related_two_hops() {
        let terms = expander()
            .expand("RISK", ExpansionStrategy::Related, 5)
            .await
            .unwrap();
        assert_eq!(terms, vec!["hazard", "threat", "danger"]);
    }

    #[tokio::test]
    async fn test_broader_reverse_lookup() {
        let terms = expander()
            .expand("danger", ExpansionStrategy::Broader, 5)
            .await
            .unwrap();
        assert_eq!(terms, vec!["hazard"]);
    }

    #[tokio::test]
    async fn test_max_terms_and_unknown() {
        let e = expander();
        let terms = e.expand("risk", ExpansionStrategy::Synonyms, 1).await.unwrap();
        assert_eq!(terms, vec!["hazard"]);
        assert!(e.expand("unknown", ExpansionStrategy::Synonyms, 5).await.unwrap().is_empty());
    }
}
