//! Core engine for docsync
//!
//! This crate coordinates the filesystem and schema layers, implementing:
//!
//! - **Document store**: atomic, per-name serialized reads and writes of JSON documents
//! - **Transforms**: filter, map and sort pipelines between list documents
//! - **Backups**: immutable, versioned snapshots with verified restore
//! - **SyncEngine**: checksum-driven synchronization into a SQLite record table
//!   on a bounded worker pool, with an append-only run history
//! - **Configuration resolution**: defaults, data directory files and environment
//!
//! # Architecture
//!
//! `docsync-core` sits above the Layer 0 crates and below the CLI:
//!
//! ```text
//!           docsync-cli
//!                |
//!          docsync-core
//!                |
//!       +--------+--------+
//!       |                 |
//!  docsync-fs      docsync-schema
//! ```
//!
//! # Example
//!
//! ```no_run
//! use docsync_core::{Engine, Result};
//!
//! fn example() -> Result<()> {
//!     let engine = Engine::open("./data")?;
//!     let summary = engine.validate_all()?;
//!     println!("{} of {} documents valid", summary.valid, summary.total);
//!     let report = engine.sync("json_records")?;
//!     println!("sync finished: {}", report.outcome);
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod locks;
pub mod records;
pub mod store;
pub mod sync;
pub mod transform;
pub mod validate;

pub use backup::{BackupEntry, BackupManager, BackupManifest, RestoreReport};
pub use config::{ConfigResolver, EngineConfig, SchemaBinding};
pub use context::{Engine, ExportReport};
pub use error::{Error, Result};
pub use history::{HistoryLedger, SyncHistoryEntry, SyncOutcome};
pub use records::{
    DEFAULT_TABLE, DatabaseLocation, HISTORY_TABLE, RecordStore, SqliteRecordStore, SyncRecord,
};
pub use store::{Document, DocumentMeta, DocumentStore, MergeReport, SearchHit, Statistics};
pub use sync::{
    CancellationFlag, RecordOutcome, RecordStatus, SyncEngine, SyncOptions, SyncPhase, SyncReport,
    WorkerPool,
};
pub use transform::{Operation, TransformEngine, TransformReport, TransformRequest};
pub use validate::{DocumentValidation, SchemaBindings, ValidationSummary};
