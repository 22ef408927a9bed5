use std::path::PathBuf;

/// Failures surfaced by [`crate::store::InsightStore::append`].
///
/// Reads never produce these: an unreadable store is logged and treated as
/// empty.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to {action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize insight records")]
    Serialize(#[from] serde_json::Error),
    #[error("insight store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
