use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::schema::InsightRecord;
use crate::store::InsightStore;

/// Minimum trimmed length, in characters, of a persistable insight.
pub const MIN_INSIGHT_CHARS: usize = 10;

/// Substrings the completion client emits when it could not produce real
/// output.  Matched case-insensitively.
pub const DEGRADED_MARKERS: &[&str] = &[
    "key missing",
    "error calling",
    "mock response",
    "encountered an error",
];

/// Where a candidate insight came from.
///
/// Completion clients flag their own placeholders as `Degraded`, so the gate
/// does not have to rely on recognising the placeholder text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    /// Real model output, or text supplied directly by the user.
    Generated,
    /// A placeholder returned because the model was unavailable or failed.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    TooShort { chars: usize },
    DegradedMarker(String),
    DegradedOrigin,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty candidate"),
            Self::TooShort { chars } => {
                write!(f, "candidate too short ({chars} < {MIN_INSIGHT_CHARS} chars)")
            }
            Self::DegradedMarker(marker) => write!(f, "degraded-output marker '{marker}'"),
            Self::DegradedOrigin => write!(f, "candidate flagged as degraded output"),
        }
    }
}

/// Decides which candidate insights are worth persisting and commits the
/// accepted ones to the store.
#[derive(Clone)]
pub struct InsightGatekeeper {
    store: Arc<dyn InsightStore>,
    min_chars: usize,
    markers: Vec<String>,
}

impl InsightGatekeeper {
    pub fn new(store: Arc<dyn InsightStore>) -> Self {
        Self {
            store,
            min_chars: MIN_INSIGHT_CHARS,
            markers: DEGRADED_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Add markers on top of [`DEGRADED_MARKERS`].
    pub fn with_extra_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.markers.extend(
            markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty()),
        );
        self
    }

    pub fn accept(&self, candidate: &str) -> bool {
        self.evaluate(candidate, CandidateOrigin::Generated).is_ok()
    }

    pub fn evaluate(&self, candidate: &str, origin: CandidateOrigin) -> Result<(), RejectReason> {
        if origin == CandidateOrigin::Degraded {
            return Err(RejectReason::DegradedOrigin);
        }

        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Err(RejectReason::Empty);
        }

        let chars = trimmed.chars().count();
        if chars < self.min_chars {
            return Err(RejectReason::TooShort { chars });
        }

        let lowered = trimmed.to_lowercase();
        if let Some(marker) = self.markers.iter().find(|m| lowered.contains(m.as_str())) {
            return Err(RejectReason::DegradedMarker(marker.clone()));
        }

        Ok(())
    }

    /// Persist `candidate` as the insight learned from `query` if it passes
    /// the gate.
    ///
    /// `Ok(None)` is a normal rejection; `Err` means the insight was accepted
    /// but could not be written.
    pub fn commit(
        &self,
        query: &str,
        candidate: &str,
        origin: CandidateOrigin,
    ) -> Result<Option<InsightRecord>, StoreError> {
        if let Err(reason) = self.evaluate(candidate, origin) {
            match reason {
                RejectReason::DegradedMarker(_) | RejectReason::DegradedOrigin => {
                    warn!(%reason, "skipping degraded output instead of learning it")
                }
                _ => debug!(%reason, "candidate insight rejected"),
            }
            return Ok(None);
        }

        let record = InsightRecord::new(query, candidate.trim());
        self.store.append(record.clone())?;
        info!(id = %record.id, tags = ?record.tags, "learned new insight");
        Ok(Some(record))
    }
}
