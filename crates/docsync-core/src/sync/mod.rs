//! Synchronization of documents into the record store
//!
//! This module provides:
//! - **engine**: the per-table sync run (validate, diff, write, record)
//! - **pool**: the bounded worker pool and cancellation flag runs use
//! - **report**: run phases and per-document outcomes

mod engine;
mod pool;
mod report;

pub use engine::{SyncEngine, SyncOptions};
pub use pool::{CancellationFlag, MAX_WORKERS, WorkerPool};
pub use report::{RecordOutcome, RecordStatus, SyncPhase, SyncReport};
