//! # history
//!
//! Assignment history storage. The rotation engine only ever reads a snapshot
//! ([`AssignmentHistory`]); writes replace one date at a time and are guarded by
//! a per-date version so two concurrent shuffles cannot silently overwrite
//! each other.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use roster_core::{Assignment, AssignmentHistory};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::persistence::write_atomically;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("history is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("assignments for {date} changed since the shuffle was computed (expected v{expected}, found v{actual})")]
    VersionConflict {
        date: NaiveDate,
        expected: u64,
        actual: u64,
    },
}

#[async_trait]
pub trait HistoryAccessor: Send + Sync {
    /// Every stored record, oldest date first.
    async fn all_assignments(&self) -> Result<Vec<Assignment>, HistoryError>;

    async fn history(&self) -> Result<AssignmentHistory, HistoryError>;

    /// Number of times `date` has been written; 0 if never.
    async fn version(&self, date: NaiveDate) -> Result<u64, HistoryError>;

    /// Replace all assignments for `date` and return the new version. With
    /// `expected_version` set, fails with [`HistoryError::VersionConflict`]
    /// when the date was written in between.
    async fn replace_for_date(
        &self,
        date: NaiveDate,
        assignments: Vec<Assignment>,
        expected_version: Option<u64>,
    ) -> Result<u64, HistoryError>;
}

// ─── Shared store ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Store {
    #[serde(default)]
    assignments: AssignmentHistory,
    #[serde(default)]
    versions: BTreeMap<NaiveDate, u64>,
}

impl Store {
    fn version(&self, date: NaiveDate) -> u64 {
        self.versions.get(&date).copied().unwrap_or(0)
    }

    fn check(&self, date: NaiveDate, expected: Option<u64>) -> Result<(), HistoryError> {
        let actual = self.version(date);
        match expected {
            Some(expected) if expected != actual => Err(HistoryError::VersionConflict { date, expected, actual }),
            _ => Ok(()),
        }
    }

    /// Copy with `date` replaced, plus the version it was written as.
    fn replaced(&self, date: NaiveDate, assignments: Vec<Assignment>) -> (Store, u64) {
        let mut next = self.clone();
        next.assignments.replace_date(date, assignments);
        let version = self.version(date) + 1;
        next.versions.insert(date, version);
        (next, version)
    }
}

// ─── In-memory ───────────────────────────────────────────────────────────────

/// Non-persistent history for tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    store: RwLock<Store>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(assignments: AssignmentHistory) -> Self {
        Self {
            store: RwLock::new(Store {
                assignments,
                versions: BTreeMap::new(),
            }),
        }
    }
}

#[async_trait]
impl HistoryAccessor for MemoryHistory {
    async fn all_assignments(&self) -> Result<Vec<Assignment>, HistoryError> {
        Ok(self.store.read().await.assignments.records().cloned().collect())
    }

    async fn history(&self) -> Result<AssignmentHistory, HistoryError> {
        Ok(self.store.read().await.assignments.clone())
    }

    async fn version(&self, date: NaiveDate) -> Result<u64, HistoryError> {
        Ok(self.store.read().await.version(date))
    }

    async fn replace_for_date(
        &self,
        date: NaiveDate,
        assignments: Vec<Assignment>,
        expected_version: Option<u64>,
    ) -> Result<u64, HistoryError> {
        let mut store = self.store.write().await;
        store.check(date, expected_version)?;
        let (next, version) = store.replaced(date, assignments);
        *store = next;
        Ok(version)
    }
}

// ─── JSON file ───────────────────────────────────────────────────────────────

/// History kept in one JSON file and mirrored in memory. The in-memory copy
/// only changes after the file write succeeded.
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    store: RwLock<Store>,
}

impl FileHistory {
    /// Open `path`, starting empty if it does not exist yet. A file that
    /// exists but cannot be parsed is an error rather than silently dropped.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();
        let store = if path.exists() {
            let data = fs::read_to_string(&path).await?;
            let store: Store = serde_json::from_str(&data)?;
            info!(
                "Loaded history from {} ({} dates)",
                path.display(),
                store.assignments.dates().count()
            );
            store
        } else {
            warn!("No history at {}, starting empty", path.display());
            Store::default()
        };

        Ok(Self {
            path,
            store: RwLock::new(store),
        })
    }
}

#[async_trait]
impl HistoryAccessor for FileHistory {
    async fn all_assignments(&self) -> Result<Vec<Assignment>, HistoryError> {
        Ok(self.store.read().await.assignments.records().cloned().collect())
    }

    async fn history(&self) -> Result<AssignmentHistory, HistoryError> {
        Ok(self.store.read().await.assignments.clone())
    }

    async fn version(&self, date: NaiveDate) -> Result<u64, HistoryError> {
        Ok(self.store.read().await.version(date))
    }

    async fn replace_for_date(
        &self,
        date: NaiveDate,
        assignments: Vec<Assignment>,
        expected_version: Option<u64>,
    ) -> Result<u64, HistoryError> {
        let mut store = self.store.write().await;
        store.check(date, expected_version)?;

        let (next, version) = store.replaced(date, assignments);
        let json = serde_json::to_vec_pretty(&next)?;
        write_atomically(&self.path, &json).await?;

        *store = next;
        debug!("History for {date} written as v{version}");
        Ok(version)
    }
}
