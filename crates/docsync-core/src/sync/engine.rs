//! SyncEngine implementation
//!
//! The SyncEngine reconciles the document store with a table in the record
//! store. A run validates every candidate document, compares its checksum
//! with the one recorded at the last sync, upserts what changed and appends
//! exactly one history entry.

use chrono::{DateTime, Utc};
use docsync_fs::{GlobPattern, NormalizedPath, RobustnessConfig, compute_value_checksum, io};
use docsync_schema::SchemaRegistry;
use serde_json::Value;
use uuid::Uuid;

use super::pool::{CancellationFlag, WorkerPool};
use super::report::{RecordOutcome, RecordStatus, SyncPhase, SyncReport};
use crate::history::{HistoryLedger, SyncHistoryEntry, SyncOutcome};
use crate::locks::KeyedLocks;
use crate::records::{RecordStore, SyncRecord, validate_table_name};
use crate::store::DocumentStore;
use crate::validate::{SchemaBindings, check_document};
use crate::{Error, Result};

/// Options for a single sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Overrides the configured worker count
    pub workers: Option<usize>,
    /// Raised by the caller to stop starting new documents
    pub cancel: CancellationFlag,
}

/// Engine for synchronizing documents into a record table
///
/// Runs against the same table are serialized twice over: by an in-process
/// keyed lock and by an fs2 lock file under `.docsync/locks/`.
pub struct SyncEngine<'a> {
    pub(crate) store: &'a DocumentStore,
    pub(crate) registry: &'a SchemaRegistry,
    pub(crate) bindings: &'a SchemaBindings,
    pub(crate) records: &'a dyn RecordStore,
    pub(crate) ledger: &'a HistoryLedger,
    pub(crate) table_locks: &'a KeyedLocks,
    pub(crate) locks_dir: NormalizedPath,
    pub(crate) pattern: &'a GlobPattern,
    pub(crate) workers: usize,
    pub(crate) robustness: RobustnessConfig,
}

struct Run<'t> {
    table: &'t str,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    phase: SyncPhase,
}

impl<'t> Run<'t> {
    fn start(table: &'t str) -> Self {
        Self {
            table,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            phase: SyncPhase::Idle,
        }
    }

    fn advance(&mut self, next: SyncPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal sync transition {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::debug!(table = self.table, from = ?self.phase, to = ?next, "Sync phase");
        self.phase = next;
    }

    fn entry(&self, counts: &Counts, outcome: SyncOutcome, error: Option<String>) -> SyncHistoryEntry {
        SyncHistoryEntry {
            sequence: 0,
            run_id: self.run_id,
            started_at: self.started_at,
            timestamp: Utc::now(),
            table_name: self.table.to_string(),
            attempted: counts.attempted,
            written: counts.written,
            skipped: counts.skipped,
            failed: counts.failed,
            cancelled: counts.cancelled,
            outcome,
            error,
        }
    }
}

#[derive(Debug, Default)]
struct Counts {
    attempted: u64,
    written: u64,
    skipped: u64,
    failed: u64,
    cancelled: u64,
}

impl Counts {
    fn tally(outcomes: &[RecordOutcome]) -> Self {
        let mut counts = Self {
            attempted: outcomes.len() as u64,
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome.status {
                RecordStatus::Written => counts.written += 1,
                RecordStatus::Skipped => counts.skipped += 1,
                RecordStatus::Failed => counts.failed += 1,
                RecordStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }
}

struct Candidate {
    name: String,
    schema: Option<String>,
    value: Value,
}

enum Diff {
    Unchanged(String),
    Changed(String),
}

impl SyncEngine<'_> {
    /// Run one sync of the store into `table`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTableName`] before anything happens,
    /// [`Error::SyncConnection`] when the record store cannot be reached
    /// (recorded as a failed run). Per-document failures never surface here;
    /// they are part of the report.
    pub fn run(&self, table: &str, options: &SyncOptions) -> Result<SyncReport> {
        validate_table_name(table)?;

        let _table_guard = self.table_locks.lock(table);
        let lock_path = self.locks_dir.join(&format!("{}.lock", table)).to_native();
        let _file_lock = io::acquire_lock(&lock_path, self.robustness.lock_timeout)?;

        let mut run = Run::start(table);
        run.advance(SyncPhase::Validating);

        if let Err(err) = self
            .records
            .connect()
            .and_then(|()| self.records.ensure_table(table))
        {
            let message = err.to_string();
            self.abort(&mut run, &message)?;
            return Err(Error::SyncConnection {
                table: table.to_string(),
                message,
            });
        }

        let pool = WorkerPool::new(options.workers.unwrap_or(self.workers));
        let outcomes = match self.execute(&mut run, pool, &options.cancel) {
            Ok(outcomes) => outcomes,
            Err(err) => {
                self.abort(&mut run, &err.to_string())?;
                return Err(err);
            }
        };

        run.advance(SyncPhase::Recording);
        let counts = Counts::tally(&outcomes);
        let outcome = SyncOutcome::from_counts(counts.written + counts.skipped, counts.failed, counts.cancelled);
        let entry = self
            .ledger
            .append(run.entry(&counts, outcome, summarize(&outcomes)))?;
        if let Err(e) = self.records.append_history(&entry) {
            tracing::warn!(table, "Failed to mirror sync history: {}", e);
        }
        run.advance(SyncPhase::Idle);

        tracing::info!(
            table,
            written = counts.written,
            skipped = counts.skipped,
            failed = counts.failed,
            cancelled = counts.cancelled,
            outcome = %outcome,
            "Sync finished"
        );

        Ok(SyncReport {
            run_id: run.run_id,
            table: table.to_string(),
            outcome,
            attempted: counts.attempted,
            written: counts.written,
            skipped: counts.skipped,
            failed: counts.failed,
            cancelled: counts.cancelled,
            records: outcomes,
            history: entry,
        })
    }

    /// Record a run-level failure in the local ledger.
    fn abort(&self, run: &mut Run<'_>, message: &str) -> Result<()> {
        run.advance(SyncPhase::Failed);
        tracing::error!(table = run.table, "Sync aborted: {}", message);
        let entry = run.entry(&Counts::default(), SyncOutcome::Failure, Some(message.to_string()));
        self.ledger.append(entry)?;
        run.advance(SyncPhase::Idle);
        Ok(())
    }

    fn execute(
        &self,
        run: &mut Run<'_>,
        pool: WorkerPool,
        cancel: &CancellationFlag,
    ) -> Result<Vec<RecordOutcome>> {
        let table = run.table;
        let names: Vec<String> = self
            .store
            .list()?
            .into_iter()
            .filter(|name| self.pattern.matches(name))
            .collect();
        let mut outcomes = Vec::with_capacity(names.len());

        // Validating
        let checked = pool.run(&names, cancel, |name| {
            check_document(self.store, self.registry, self.bindings, name)
        });
        let mut ready = Vec::new();
        for (name, result) in names.iter().zip(checked) {
            match result {
                None => outcomes.push(RecordOutcome::new(name, None, RecordStatus::Cancelled)),
                Some((validation, Some(value))) => ready.push(Candidate {
                    name: name.clone(),
                    schema: validation.schema,
                    value,
                }),
                Some((validation, None)) => {
                    let reason = validation.description.unwrap_or_default();
                    tracing::warn!(document = %name, "Excluded from sync: {}", reason);
                    outcomes.push(RecordOutcome::failed(name, validation.schema, reason));
                }
            }
        }

        run.advance(SyncPhase::Diffing);
        let diffed = pool.run(&ready, cancel, |candidate| self.diff(table, candidate));
        let mut changed = Vec::new();
        for (candidate, result) in ready.into_iter().zip(diffed) {
            match result {
                None => outcomes.push(RecordOutcome::new(
                    &candidate.name,
                    candidate.schema,
                    RecordStatus::Cancelled,
                )),
                Some(Ok(Diff::Unchanged(checksum))) => {
                    tracing::debug!(document = %candidate.name, "Unchanged since last sync");
                    outcomes.push(RecordOutcome {
                        checksum: Some(checksum),
                        ..RecordOutcome::new(&candidate.name, candidate.schema, RecordStatus::Skipped)
                    });
                }
                Some(Ok(Diff::Changed(checksum))) => changed.push((candidate, checksum)),
                Some(Err(err)) => {
                    tracing::warn!(document = %candidate.name, "{}", err);
                    outcomes.push(RecordOutcome::failed(&candidate.name, candidate.schema, err.to_string()));
                }
            }
        }

        run.advance(SyncPhase::Writing);
        let written = pool.run(&changed, cancel, |(candidate, checksum)| {
            self.write(table, candidate, checksum)
        });
        for ((candidate, checksum), result) in changed.into_iter().zip(written) {
            let outcome = match result {
                None => RecordOutcome::new(&candidate.name, candidate.schema, RecordStatus::Cancelled),
                Some(Ok(())) => RecordOutcome {
                    checksum: Some(checksum),
                    ..RecordOutcome::new(&candidate.name, candidate.schema, RecordStatus::Written)
                },
                Some(Err(err)) => {
                    tracing::warn!(document = %candidate.name, "{}", err);
                    RecordOutcome::failed(&candidate.name, candidate.schema, err.to_string())
                }
            };
            outcomes.push(outcome);
        }

        outcomes.sort_by(|a, b| a.document.cmp(&b.document));
        Ok(outcomes)
    }

    fn diff(&self, table: &str, candidate: &Candidate) -> Result<Diff> {
        let checksum = compute_value_checksum(&candidate.value);
        let last = self
            .records
            .last_synced_checksum(table, &candidate.name)
            .map_err(|e| record_error(&candidate.name, e))?;

        if last.as_deref() == Some(checksum.as_str()) {
            Ok(Diff::Unchanged(checksum))
        } else {
            Ok(Diff::Changed(checksum))
        }
    }

    fn write(&self, table: &str, candidate: &Candidate, checksum: &str) -> Result<()> {
        let record = SyncRecord {
            key: candidate.name.clone(),
            payload: candidate.value.clone(),
            checksum: checksum.to_string(),
            last_synced_at: Utc::now(),
        };
        self.records
            .upsert(table, &record)
            .map_err(|e| record_error(&candidate.name, e))?;
        tracing::debug!(document = %candidate.name, table, "Upserted record");
        Ok(())
    }
}

fn record_error(document: &str, err: Error) -> Error {
    Error::SyncRecord {
        document: document.to_string(),
        message: err.to_string(),
    }
}

/// Error detail for the history entry, `None` for a clean run.
fn summarize(outcomes: &[RecordOutcome]) -> Option<String> {
    let mut parts: Vec<String> = outcomes
        .iter()
        .filter(|o| o.status == RecordStatus::Failed)
        .map(|o| format!("{}: {}", o.document, o.error.as_deref().unwrap_or("failed")))
        .collect();

    let cancelled = outcomes
        .iter()
        .filter(|o| o.status == RecordStatus::Cancelled)
        .count();
    if cancelled > 0 {
        parts.push(format!("cancelled before {} document(s) started", cancelled));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}
