//! Lexical relevance ranking of stored insights.
//!
//! ```text
//! overlap(record) = | tokenize(query) ∩ tokenize(record.query + " " + record.insight) |
//! ```
//!
//! Records with zero overlap are dropped; the rest are ordered by overlap,
//! highest first.  The sort is stable, so records with equal overlap keep
//! their insertion order.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::schema::InsightRecord;
use crate::store::InsightStore;
use crate::tokenizer::tokenize;

/// Number of insights recalled per query unless configured otherwise.
pub const DEFAULT_RECALL_LIMIT: usize = 3;

/// A recalled insight with the terms it shared with the query.
#[derive(Debug, Clone)]
pub struct RankedInsight {
    pub record: InsightRecord,
    pub overlap: usize,
    pub matched_terms: Vec<String>,
}

#[derive(Clone)]
pub struct RelevanceRanker {
    store: Arc<dyn InsightStore>,
    limit: usize,
}

impl RelevanceRanker {
    pub fn new(store: Arc<dyn InsightStore>) -> Self {
        Self {
            store,
            limit: DEFAULT_RECALL_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Up to `limit` records, most relevant first.
    pub fn find_relevant(&self, query: &str) -> Vec<InsightRecord> {
        self.find_relevant_scored(query)
            .into_iter()
            .map(|ranked| ranked.record)
            .collect()
    }

    pub fn find_relevant_scored(&self, query: &str) -> Vec<RankedInsight> {
        let records = self.store.load();
        let ranked = rank(records, query, self.limit);
        debug!(
            query_len = query.len(),
            returned = ranked.len(),
            store = %self.store.describe(),
            "recalled insights"
        );
        ranked
    }
}

/// Score `records` against `query` and keep the best `limit`.
///
/// Exposed separately from [`RelevanceRanker`] so callers holding a
/// snapshot of records can rank without touching storage.
pub fn rank(records: Vec<InsightRecord>, query: &str, limit: usize) -> Vec<RankedInsight> {
    let query_terms = tokenize(query);
    if query_terms.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<RankedInsight> = records
        .into_iter()
        .filter_map(|record| score(record, &query_terms))
        .collect();

    // `sort_by` is stable: equal overlaps stay in insertion order.
    ranked.sort_by(|a, b| b.overlap.cmp(&a.overlap));
    ranked.truncate(limit);
    ranked
}

fn score(record: InsightRecord, query_terms: &BTreeSet<String>) -> Option<RankedInsight> {
    let item_terms = tokenize(&record.searchable_text());
    let matched_terms: Vec<String> = query_terms.intersection(&item_terms).cloned().collect();
    if matched_terms.is_empty() {
        return None;
    }

    trace!(id = %record.id, overlap = matched_terms.len(), ?matched_terms, "scored insight");
    Some(RankedInsight {
        overlap: matched_terms.len(),
        matched_terms,
        record,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::InMemoryStore;

    fn ranker_with(records: Vec<InsightRecord>) -> RelevanceRanker {
        RelevanceRanker::new(Arc::new(InMemoryStore::with_records(records)))
    }

    #[test]
    fn empty_store_returns_nothing() {
        let ranker = ranker_with(Vec::new());
        assert!(ranker.find_relevant("What is the capital of Mars?").is_empty());
    }

    #[test]
    fn mars_insight_is_recalled_first() {
        let unrelated = InsightRecord::new(
            "How should I name Rust crates?",
            "Prefer short, lowercase crate names joined by hyphens.",
        );
        let mars = InsightRecord::new(
            "What is the capital of Mars?",
            "The capital of Mars is Elonville.",
        );
        let ranker = ranker_with(vec![unrelated, mars.clone()]);

        let found = ranker.find_relevant("What is the capital of Mars?");
        assert_eq!(found.first().map(|r| r.id.clone()), Some(mars.id.clone()));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn never_returns_more_than_three() {
        let records: Vec<InsightRecord> = (0..10)
            .map(|i| InsightRecord::new(format!("kubernetes question {i}"), "Pin kubernetes versions."))
            .collect();
        let ranker = ranker_with(records);
        assert_eq!(ranker.find_relevant("kubernetes upgrade").len(), 3);
    }

    #[test]
    fn equal_overlap_preserves_insertion_order() {
        let records: Vec<InsightRecord> = (0..5)
            .map(|i| InsightRecord::new(format!("postgres tip {i}"), "Vacuum regularly."))
            .collect();
        let expected: Vec<_> = records.iter().take(3).map(|r| r.id.clone()).collect();
        let ranker = ranker_with(records);

        let found: Vec<_> = ranker.find_relevant("postgres").iter().map(|r| r.id.clone()).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn higher_overlap_outranks_earlier_records() {
        let weak = InsightRecord::new("tokio question", "Use tokio for async IO.");
        let strong = InsightRecord::new(
            "tokio runtime shutdown",
            "Drop the tokio runtime outside async context to shut down cleanly.",
        );
        let ranker = ranker_with(vec![weak.clone(), strong.clone()]);

        let scored = ranker.find_relevant_scored("graceful tokio runtime shutdown");
        assert_eq!(scored[0].record.id, strong.id);
        assert_eq!(scored[0].overlap, 3);
        assert_eq!(scored[1].record.id, weak.id);
        assert_eq!(scored[1].matched_terms, vec!["tokio"]);
    }

    #[test]
    fn insight_text_counts_toward_overlap() {
        let record = InsightRecord::new("Where do colonists live?", "Most colonists live in Elonville.");
        let ranker = ranker_with(vec![record.clone()]);
        assert_eq!(ranker.find_relevant("elonville")[0].id, record.id);
    }

    #[test]
    fn stop_word_query_matches_nothing() {
        let record = InsightRecord::new("what is the answer", "The answer is forty two.");
        let ranker = ranker_with(vec![record]);
        assert!(ranker.find_relevant("what is the?").is_empty());
    }

    #[test]
    fn zero_overlap_records_are_filtered() {
        let record = InsightRecord::new("gardening advice", "Water tomatoes in the morning.");
        let ranker = ranker_with(vec![record]);
        assert!(ranker.find_relevant("compiler optimisation").is_empty());
    }

    #[test]
    fn custom_limit_is_respected() {
        let records: Vec<InsightRecord> = (0..6)
            .map(|i| InsightRecord::new(format!("redis note {i}"), "Set maxmemory."))
            .collect();
        let ranker = ranker_with(records).with_limit(5);
        assert_eq!(ranker.find_relevant("redis").len(), 5);
        assert!(rank(Vec::new(), "redis", 0).is_empty());
    }
}
