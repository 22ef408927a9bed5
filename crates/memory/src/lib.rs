pub mod error;
pub mod gatekeeper;
pub mod manager;
pub mod ranker;
pub mod schema;
pub mod store;
pub mod tokenizer;

pub use error::StoreError;
pub use gatekeeper::{CandidateOrigin, InsightGatekeeper, RejectReason};
pub use manager::{InsightMemory, MemoryStats};
pub use ranker::{DEFAULT_RECALL_LIMIT, RankedInsight, RelevanceRanker};
pub use schema::InsightRecord;
pub use store::{InMemoryStore, InsightStore, JsonFileStore};
pub use tokenizer::tokenize;
