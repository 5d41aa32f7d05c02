//! Sync run state and reporting types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::{SyncHistoryEntry, SyncOutcome};

/// Phase of a sync run.
///
/// `Idle → Validating → Diffing → Writing → Recording → Idle`, or
/// `→ Failed → Idle` from any non-idle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Validating,
    Diffing,
    Writing,
    Recording,
    Failed,
}

impl SyncPhase {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_advance_to(self, next: SyncPhase) -> bool {
        use SyncPhase::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Diffing)
                | (Diffing, Writing)
                | (Writing, Recording)
                | (Recording, Idle)
                | (Failed, Idle)
        ) || (self != Idle && next == Failed)
    }
}

/// What happened to one document in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Upserted into the table
    Written,
    /// Checksum unchanged since the last sync
    Skipped,
    /// Excluded by validation, or the write failed
    Failed,
    /// Never started because the run was cancelled
    Cancelled,
}

/// Per-document result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub document: String,
    pub schema: Option<String>,
    pub status: RecordStatus,
    pub checksum: Option<String>,
    pub error: Option<String>,
}

impl RecordOutcome {
    pub(crate) fn new(document: &str, schema: Option<String>, status: RecordStatus) -> Self {
        Self {
            document: document.to_string(),
            schema,
            status,
            checksum: None,
            error: None,
        }
    }

    pub(crate) fn failed(document: &str, schema: Option<String>, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(document, schema, RecordStatus::Failed)
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub table: String,
    pub outcome: SyncOutcome,
    pub attempted: u64,
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Per-document results, ascending by document name
    pub records: Vec<RecordOutcome>,
    /// The ledger entry recorded for this run
    pub history: SyncHistoryEntry,
}

impl SyncReport {
    pub fn errors(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.records.iter().filter(|r| r.status == RecordStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        use SyncPhase::*;
        let path = [Idle, Validating, Diffing, Writing, Recording, Idle];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn failure_only_from_active_phases() {
        use SyncPhase::*;
        assert!(Validating.can_advance_to(Failed));
        assert!(Writing.can_advance_to(Failed));
        assert!(Failed.can_advance_to(Idle));
        assert!(!Idle.can_advance_to(Failed));
        assert!(!Idle.can_advance_to(Writing));
        assert!(!Writing.can_advance_to(Validating));
    }
}
