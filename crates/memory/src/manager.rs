use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::StoreError;
use crate::gatekeeper::{CandidateOrigin, InsightGatekeeper};
use crate::ranker::{RankedInsight, RelevanceRanker};
use crate::schema::InsightRecord;
use crate::store::{InMemoryStore, InsightStore, JsonFileStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    pub total: usize,
    pub distinct_queries: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    /// Most frequent tags, highest count first (ties alphabetical).
    pub top_tags: Vec<(String, usize)>,
}

/// The insight memory: one store shared by the ranker that reads it and the
/// gatekeeper that writes to it.
#[derive(Clone)]
pub struct InsightMemory {
    store: Arc<dyn InsightStore>,
    ranker: RelevanceRanker,
    gatekeeper: InsightGatekeeper,
}

impl InsightMemory {
    pub fn new(store: Arc<dyn InsightStore>) -> Self {
        Self {
            ranker: RelevanceRanker::new(store.clone()),
            gatekeeper: InsightGatekeeper::new(store.clone()),
            store,
        }
    }

    /// File-backed memory at `path`.  Nothing is created until the first
    /// read or write.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        info!(path = %path.display(), "opening insight memory");
        Self::new(Arc::new(JsonFileStore::new(path)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.ranker = self.ranker.with_limit(limit);
        self
    }

    pub fn with_extra_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.gatekeeper = self.gatekeeper.with_extra_markers(markers);
        self
    }

    pub fn store(&self) -> &Arc<dyn InsightStore> {
        &self.store
    }

    pub fn gatekeeper(&self) -> &InsightGatekeeper {
        &self.gatekeeper
    }

    pub fn recall(&self, query: &str) -> Vec<InsightRecord> {
        self.ranker.find_relevant(query)
    }

    pub fn recall_scored(&self, query: &str) -> Vec<RankedInsight> {
        self.ranker.find_relevant_scored(query)
    }

    pub fn learn(
        &self,
        query: &str,
        candidate: &str,
        origin: CandidateOrigin,
    ) -> Result<Option<InsightRecord>, StoreError> {
        self.gatekeeper.commit(query, candidate, origin)
    }

    pub fn all(&self) -> Vec<InsightRecord> {
        self.store.load()
    }

    pub fn stats(&self) -> MemoryStats {
        stats_for(&self.store.load(), 5)
    }
}

fn stats_for(records: &[InsightRecord], top_n: usize) -> MemoryStats {
    let distinct_queries = records
        .iter()
        .map(|r| r.query.trim().to_lowercase())
        .collect::<HashSet<_>>()
        .len();

    let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        for tag in record.effective_tags() {
            *tag_counts.entry(tag).or_insert(0) += 1;
        }
    }
    let mut top_tags: Vec<(String, usize)> = tag_counts.into_iter().collect();
    // Stable sort over the alphabetical BTreeMap order.
    top_tags.sort_by(|a, b| b.1.cmp(&a.1));
    top_tags.truncate(top_n);

    MemoryStats {
        total: records.len(),
        distinct_queries,
        oldest: records.iter().map(|r| r.timestamp).min(),
        newest: records.iter().map(|r| r.timestamp).max(),
        top_tags,
    }
}
