use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::schema::InsightRecord;

/// Durable, insertion-ordered sequence of insight records.
///
/// Implementations are injected into the ranker and gatekeeper as
/// `Arc<dyn InsightStore>`; there is no process-wide store.
pub trait InsightStore: Send + Sync {
    /// Every record in insertion order.  Missing, unreadable, or corrupt
    /// storage yields an empty sequence; the condition is logged, not raised.
    fn load(&self) -> Vec<InsightRecord>;

    /// Append one record, rewriting the whole sequence.
    fn append(&self, record: InsightRecord) -> Result<(), StoreError>;

    /// Human-readable location for logs and diagnostics.
    fn describe(&self) -> String;
}

/// Single JSON file holding a pretty-printed array of records.
///
/// Writes go to a temporary sibling that is fsync'd and then renamed over
/// the live file, so a crash mid-write leaves the previous contents intact.
/// Appends through one `JsonFileStore` are serialized; separate processes
/// sharing the file are not coordinated and the last rename wins.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let filename = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "insights.json".to_string());
        self.path.with_file_name(format!("{filename}.{suffix}"))
    }

    /// Records currently on disk.
    ///
    /// A missing or blank file is empty.  A corrupt file is copied to a
    /// `.corrupt` sidecar and read as empty.  Any other read failure is an
    /// error.
    fn try_read_records(&self) -> Result<Vec<InsightRecord>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("read", &self.path, err)),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice::<Vec<InsightRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                let corrupt_path = self.sibling("corrupt");
                warn!(
                    error = %err,
                    path = %self.path.display(),
                    sidecar = %corrupt_path.display(),
                    "corrupt insight store; treating as empty (original bytes copied to sidecar)"
                );
                fs::write(&corrupt_path, &raw)
                    .map_err(|err| StoreError::io("preserve corrupt store as", &corrupt_path, err))?;
                Ok(Vec::new())
            }
        }
    }

    fn read_records(&self) -> Vec<InsightRecord> {
        if let Err(err) = self.ensure_parent_dir() {
            warn!(error = %err, path = %self.path.display(), "cannot create insight store directory");
            return Vec::new();
        }

        match self.try_read_records() {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "insight store unreadable; treating as empty");
                Vec::new()
            }
        }
    }

    fn write_records(&self, records: &[InsightRecord]) -> Result<(), StoreError> {
        self.ensure_parent_dir().map_err(|err| {
            StoreError::io(
                "create directory for",
                self.path.parent().unwrap_or(&self.path),
                err,
            )
        })?;

        let body = serde_json::to_vec_pretty(records)?;
        let tmp_path = self.sibling(&format!("{}.tmp", std::process::id()));

        let write_result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&body)?;
            file.write_all(b"\n")?;
            file.flush()?;
            file.sync_all()
        })();
        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::io("write", &tmp_path, err));
        }

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::io("replace", &self.path, err));
        }
        Ok(())
    }
}

impl InsightStore for JsonFileStore {
    fn load(&self) -> Vec<InsightRecord> {
        self.read_records()
    }

    fn append(&self, record: InsightRecord) -> Result<(), StoreError> {
        let _guard = self.append_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut records = self.try_read_records()?;
        let id = record.id.clone();
        records.push(record);
        self.write_records(&records)?;
        debug!(%id, total = records.len(), path = %self.path.display(), "insight appended");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Volatile store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<InsightRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<InsightRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl InsightStore for InMemoryStore {
    fn load(&self) -> Vec<InsightRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn append(&self, record: InsightRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(record);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
