use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::tokenizer::tokenize;

/// One learned insight, persisted in insertion order.
///
/// Every field is fixed at creation time.  `tags` is a retrieval hint derived
/// from `query` only; relevance scoring re-tokenizes `query + insight` on
/// every recall and never reads the tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightRecord {
    /// Opaque id.  New records get a time-ordered UUID v7; files written by
    /// older tools may hold plain strings or integers, read back as text.
    #[serde(deserialize_with = "id_from_text_or_integer")]
    pub id: String,
    pub query: String,
    pub insight: String,
    pub timestamp: DateTime<Utc>,
    /// Empty in files written before tags existed; see [`InsightRecord::effective_tags`].
    #[serde(default)]
    pub tags: Vec<String>,
}

impl InsightRecord {
    pub fn new(query: impl Into<String>, insight: impl Into<String>) -> Self {
        let query = query.into();
        let tags = derive_tags(&query);
        Self {
            id: Uuid::now_v7().to_string(),
            query,
            insight: insight.into(),
            timestamp: Utc::now(),
            tags,
        }
    }

    /// Stored tags, or the same tags re-derived from `query` when the record
    /// predates them.
    pub fn effective_tags(&self) -> Vec<String> {
        if self.tags.is_empty() {
            derive_tags(&self.query)
        } else {
            self.tags.clone()
        }
    }

    /// Text the ranker scores against.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.query, self.insight)
    }

    /// At most the first 8 characters of the id, for compact display.
    pub fn id_short(&self) -> &str {
        truncate_str(&self.id, 8)
    }
}

fn id_from_text_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

fn derive_tags(query: &str) -> Vec<String> {
    tokenize(query).into_iter().collect()
}

/// Truncate `s` to at most `max_chars` Unicode scalar values.
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
