//! Append-only sync history ledger
//!
//! One JSON line per sync run in `.docsync/history.jsonl`. Appends hold an
//! exclusive fs2 lock on a sidecar lock file, so entries from concurrent
//! processes never interleave, and each entry receives the next sequence
//! number. Entries are never rewritten.

use std::fs::OpenOptions;
use std::io::Write;

use chrono::{DateTime, Utc};
use docsync_fs::{NormalizedPath, RobustnessConfig, io};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// Overall result of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Success,
    Partial,
    Failure,
}

impl SyncOutcome {
    /// Outcome for a completed run.
    ///
    /// Success when nothing failed or was cancelled, failure when nothing
    /// succeeded despite failures or cancellations, partial otherwise.
    pub fn from_counts(succeeded: u64, failed: u64, cancelled: u64) -> Self {
        if failed == 0 && cancelled == 0 {
            Self::Success
        } else if succeeded == 0 {
            Self::Failure
        } else {
            Self::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failure => "failure",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "success" => Some(Self::Success),
            "partial" => Some(Self::Partial),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sync run, as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncHistoryEntry {
    /// Position in the ledger, assigned on append
    pub sequence: u64,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    pub table_name: String,
    pub attempted: u64,
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
    #[serde(default)]
    pub cancelled: u64,
    pub outcome: SyncOutcome,
    pub error: Option<String>,
}

/// The local history file.
pub struct HistoryLedger {
    path: NormalizedPath,
    robustness: RobustnessConfig,
}

impl HistoryLedger {
    pub fn new(path: NormalizedPath) -> Self {
        Self::with_robustness(path, RobustnessConfig::default())
    }

    pub fn with_robustness(path: NormalizedPath, robustness: RobustnessConfig) -> Self {
        Self { path, robustness }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// Append an entry, assigning it the next sequence number.
    pub fn append(&self, mut entry: SyncHistoryEntry) -> Result<SyncHistoryEntry> {
        let native = self.path.to_native();
        let _lock = io::acquire_lock(&io::lock_path_for(&native), self.robustness.lock_timeout)?;

        let last = self.read_entries()?.iter().map(|e| e.sequence).max().unwrap_or(0);
        entry.sequence = last + 1;

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&native)
            .map_err(|e| docsync_fs::Error::io(&native, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| docsync_fs::Error::io(&native, e))?;
        if self.robustness.enable_fsync {
            file.sync_all().map_err(|e| docsync_fs::Error::io(&native, e))?;
        }

        tracing::debug!(
            table = %entry.table_name,
            sequence = entry.sequence,
            outcome = %entry.outcome,
            "Appended sync history"
        );
        Ok(entry)
    }

    /// Entries ordered by run start, ties broken by sequence.
    pub fn entries(&self, table: Option<&str>) -> Result<Vec<SyncHistoryEntry>> {
        let mut entries: Vec<_> = self
            .read_entries()?
            .into_iter()
            .filter(|e| table.is_none_or(|t| e.table_name == t))
            .collect();
        entries.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then(a.sequence.cmp(&b.sequence))
        });
        Ok(entries)
    }

    fn read_entries(&self) -> Result<Vec<SyncHistoryEntry>> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let content = io::read_text(&self.path)?;

        let mut entries = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Skipping malformed history line {}: {}", number + 1, e);
                }
            }
        }
        Ok(entries)
    }
}
