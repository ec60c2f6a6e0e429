//! Ranked exact/partial query evaluation over the shared index.
//!
//! Queries run as tasks on their own work queue (a separate pool from
//! indexing, so neither workload starves the other). Each query's
//! match-count table is private to its task; only index reads are shared,
//! and those go through the read side of the shared lock. Scoring is
//! deferred until results are requested.

use crate::index::SharedIndex;
use crate::work_queue::WorkQueue;
use parking_lot::RwLock;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Exact,
    Partial,
}

/// One ranked hit. Entries order by descending score, then descending
/// count, then ascending document for a deterministic total order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub count: usize,
    pub score: f64,
    #[serde(rename = "where")]
    pub document: String,
}

impl QueryResult {
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| self.document.cmp(&other.document))
    }
}

/// Canonical key for a query: the sorted, deduplicated terms joined by
/// spaces.
pub fn query_key(terms: &BTreeSet<String>) -> String {
    terms.iter().cloned().collect::<Vec<_>>().join(" ")
}

type CalculationTable = BTreeMap<String, BTreeMap<String, usize>>;

pub struct QueryEngine {
    index: Arc<SharedIndex>,
    queue: WorkQueue,
    mode: SearchMode,
    // Engine-private memo table; the shared lock only covers the index,
    // word counts, and crawl frontier.
    calculations: Arc<RwLock<CalculationTable>>,
}

impl QueryEngine {
    pub fn new(index: Arc<SharedIndex>, threads: usize, mode: SearchMode) -> Self {
        Self {
            index,
            queue: WorkQueue::new(threads),
            mode,
            calculations: Arc::new(RwLock::new(CalculationTable::new())),
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Evaluates one query on the calling thread. Memoized: a key already in
    /// the calculation table is never recomputed.
    pub fn search(&self, terms: &BTreeSet<String>) {
        evaluate(&self.index, &self.calculations, terms, self.mode);
    }

    /// Dispatches one task per query onto this engine's pool and waits for
    /// all of them.
    pub fn search_all(&self, queries: Vec<BTreeSet<String>>) {
        for terms in queries {
            let index = Arc::clone(&self.index);
            let calculations = Arc::clone(&self.calculations);
            let mode = self.mode;
            self.queue
                .execute(move || evaluate(&index, &calculations, &terms, mode));
        }
        self.queue.join();
    }

    /// Ranked entries for an evaluated query key; empty when the key is
    /// unknown or nothing matched. Scores are computed here, against the
    /// word counts at the moment of the call.
    pub fn ranked(&self, key: &str) -> Vec<QueryResult> {
        let calculations = self.calculations.read();
        match calculations.get(key) {
            Some(matches) => rank(&self.index, matches),
            None => Vec::new(),
        }
    }

    /// Every evaluated query with its ranked entries, for export.
    pub fn all_ranked(&self) -> BTreeMap<String, Vec<QueryResult>> {
        let calculations = self.calculations.read();
        calculations
            .iter()
            .map(|(key, matches)| (key.clone(), rank(&self.index, matches)))
            .collect()
    }
}

fn evaluate(
    index: &SharedIndex,
    calculations: &RwLock<CalculationTable>,
    terms: &BTreeSet<String>,
    mode: SearchMode,
) {
    let key = query_key(terms);
    {
        // Reserve the key and skip repeats in one critical section.
        let mut table = calculations.write();
        if table.contains_key(&key) {
            return;
        }
        table.insert(key.clone(), BTreeMap::new());
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for term in terms {
        let matching: BTreeSet<String> = match mode {
            SearchMode::Exact => {
                if index.contains(term) {
                    BTreeSet::from([term.clone()])
                } else {
                    continue;
                }
            }
            SearchMode::Partial => index.by_prefix(term),
        };
        for word in &matching {
            if let Some(postings) = index.get(word) {
                for (document, positions) in postings {
                    *counts.entry(document).or_insert(0) += positions.len();
                }
            }
        }
    }
    calculations.write().insert(key, counts);
}

fn rank(index: &SharedIndex, matches: &BTreeMap<String, usize>) -> Vec<QueryResult> {
    let mut entries: Vec<QueryResult> = matches
        .iter()
        .filter(|(_, &count)| count > 0)
        .map(|(document, &count)| {
            let total = index.word_count(document).unwrap_or(0);
            let score = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            };
            QueryResult {
                count,
                score,
                document: document.clone(),
            }
        })
        .collect();
    entries.sort_by(QueryResult::cmp_rank);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InvertedIndex;
    use crate::lock::ReadWriteLock;

    fn stems(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn shared_index(docs: &[(&str, &str)]) -> Arc<SharedIndex> {
        let index = Arc::new(SharedIndex::new(Arc::new(ReadWriteLock::new())));
        for (document, text) in docs {
            let mut fragment = InvertedIndex::new();
            fragment.add_stems(&stems(text), document);
            index.merge(&fragment);
        }
        index
    }

    fn terms(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn score_is_matches_over_total_words() {
        let index = shared_index(&[("doc", "ant ant ant bee bee cow cow dog dog dog")]);
        let engine = QueryEngine::new(index, 1, SearchMode::Exact);
        let query = terms(&["ant"]);
        engine.search(&query);
        let ranked = engine.ranked(&query_key(&query));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].count, 3);
        assert!((ranked[0].score - 0.3).abs() < 1e-12);
    }

    #[test]
    fn exact_fox_ranks_a_above_b() {
        let index = shared_index(&[("a.txt", "fox jump fox"), ("b.txt", "lazy fox")]);
        let engine = QueryEngine::new(index, 1, SearchMode::Exact);
        let query = terms(&["fox"]);
        engine.search(&query);
        let ranked = engine.ranked("fox");
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].document, "a.txt");
        assert_eq!(ranked[0].count, 2);
        assert!((ranked[0].score - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(ranked[1].document, "b.txt");
        assert_eq!(ranked[1].count, 1);
        assert!((ranked[1].score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn partial_results_are_a_superset_of_exact() {
        let docs = [
            ("a.txt", "jump jumper fox"),
            ("b.txt", "jumping high"),
            ("c.txt", "nothing here"),
        ];
        let query = terms(&["jump"]);

        let exact = QueryEngine::new(shared_index(&docs), 1, SearchMode::Exact);
        exact.search(&query);
        let exact_docs: BTreeSet<String> = exact
            .ranked("jump")
            .into_iter()
            .map(|entry| entry.document)
            .collect();

        let partial = QueryEngine::new(shared_index(&docs), 1, SearchMode::Partial);
        partial.search(&query);
        let partial_docs: BTreeSet<String> = partial
            .ranked("jump")
            .into_iter()
            .map(|entry| entry.document)
            .collect();

        assert!(partial_docs.is_superset(&exact_docs));
        assert!(partial_docs.contains("b.txt"));
        assert!(!partial_docs.contains("c.txt"));
    }

    #[test]
    fn counts_accumulate_across_terms_and_matching_words() {
        let index = shared_index(&[("a.txt", "cat cap dog")]);
        let engine = QueryEngine::new(index, 1, SearchMode::Partial);
        let query = terms(&["ca", "dog"]);
        engine.search(&query);
        let ranked = engine.ranked(&query_key(&query));
        // "ca" matches cat and cap, "dog" matches dog: 3 of 3 words.
        assert_eq!(ranked[0].count, 3);
        assert!((ranked[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unmatched_query_yields_empty_results_not_an_error() {
        let index = shared_index(&[("a.txt", "fox")]);
        let engine = QueryEngine::new(index, 1, SearchMode::Partial);
        let query = terms(&["zebra"]);
        engine.search(&query);
        assert!(engine.ranked("zebra").is_empty());
        assert!(engine.ranked("never evaluated").is_empty());
    }

    #[test]
    fn repeated_queries_are_not_recomputed() {
        let index = shared_index(&[("a.txt", "fox jump")]);
        let engine = QueryEngine::new(Arc::clone(&index), 1, SearchMode::Exact);
        let query = terms(&["fox"]);
        engine.search(&query);
        let first = engine.ranked("fox");
        // New matches appear in the index, but the memoized calculation
        // keeps its original match counts.
        index.add("fox", "c.txt", 1);
        engine.search(&query);
        let second = engine.ranked("fox");
        assert_eq!(
            first.iter().map(|e| (&e.document, e.count)).collect::<Vec<_>>(),
            second.iter().map(|e| (&e.document, e.count)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn ties_break_by_count_then_document() {
        // b and c end with identical scores and counts; document name
        // decides between them. a leads on score.
        let index = shared_index(&[
            ("a.txt", "fox fox"),
            ("c.txt", "fox pad"),
            ("b.txt", "fox pad"),
        ]);
        let engine = QueryEngine::new(index, 1, SearchMode::Exact);
        let query = terms(&["fox"]);
        engine.search(&query);
        let ranked = engine.ranked("fox");
        let order: Vec<&str> = ranked.iter().map(|e| e.document.as_str()).collect();
        assert_eq!(order, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn concurrent_queries_do_not_interfere() {
        let index = shared_index(&[("a.txt", "fox jump fox"), ("b.txt", "lazy fox")]);
        let engine = QueryEngine::new(index, 4, SearchMode::Partial);
        let queries: Vec<BTreeSet<String>> = (0..20)
            .map(|i| match i % 3 {
                0 => terms(&["fox"]),
                1 => terms(&["jump"]),
                _ => terms(&["lazi", "fox"]),
            })
            .collect();
        engine.search_all(queries);
        assert_eq!(engine.all_ranked().len(), 3);
        assert_eq!(engine.ranked("fox")[0].document, "a.txt");
    }
}
