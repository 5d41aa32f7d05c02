//! External record store
//!
//! Synchronized documents live in a relational table, one row per document
//! name:
//!
//! | column           | content                                |
//! |------------------|----------------------------------------|
//! | `key`            | document name (primary key)            |
//! | `payload`        | compact JSON of the document           |
//! | `checksum`       | checksum of the payload when synced    |
//! | `last_synced_at` | RFC 3339 timestamp of the last write   |
//!
//! Sync runs are mirrored into a `sync_history` table in the same store.

mod sqlite;

pub use sqlite::{DatabaseLocation, SqliteRecordStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::history::SyncHistoryEntry;
use crate::{Error, Result};

/// Default table for synchronized documents.
pub const DEFAULT_TABLE: &str = "json_records";

/// Table holding the mirrored sync history.
pub const HISTORY_TABLE: &str = "sync_history";

/// A document as stored in the external table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub key: String,
    pub payload: Value,
    pub checksum: String,
    pub last_synced_at: DateTime<Utc>,
}

/// Connection to the store synchronized records are written to.
///
/// Implementations must be usable from several sync workers at once.
pub trait RecordStore: Send + Sync {
    /// Establish the connection. Failing here aborts a sync run.
    fn connect(&self) -> Result<()>;

    /// Create `table` if it does not exist.
    fn ensure_table(&self, table: &str) -> Result<()>;

    /// Checksum recorded by the last successful write of `key`.
    fn last_synced_checksum(&self, table: &str, key: &str) -> Result<Option<String>>;

    /// Insert or replace one record.
    fn upsert(&self, table: &str, record: &SyncRecord) -> Result<()>;

    fn get_record(&self, table: &str, key: &str) -> Result<Option<SyncRecord>>;

    /// Every record of `table`, ascending by key.
    fn export(&self, table: &str) -> Result<Vec<SyncRecord>>;

    fn append_history(&self, entry: &SyncHistoryEntry) -> Result<()>;

    /// Mirrored history entries, optionally for one table only.
    fn history(&self, table: Option<&str>) -> Result<Vec<SyncHistoryEntry>>;
}

/// Check that `name` is usable as a record table.
///
/// Table names are interpolated into SQL, so only plain identifiers are
/// accepted; the history table and SQLite's internal names are reserved.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let well_formed = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    let lowered = name.to_ascii_lowercase();
    let reserved = lowered == HISTORY_TABLE || lowered.starts_with("sqlite_");

    if well_formed && !reserved {
        Ok(())
    } else {
        Err(Error::InvalidTableName {
            name: name.to_string(),
        })
    }
}
