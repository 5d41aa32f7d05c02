//! SQLite-backed record store

use std::fs;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use docsync_fs::NormalizedPath;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use super::{HISTORY_TABLE, RecordStore, SyncRecord, validate_table_name};
use crate::history::{SyncHistoryEntry, SyncOutcome};
use crate::{Error, Result};

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(NormalizedPath),
}

impl DatabaseLocation {
    /// Parse a database URL.
    ///
    /// Accepts `sqlite::memory:`, `sqlite://<path>` and bare paths. Relative
    /// paths are resolved against `base`.
    pub fn parse(url: &str, base: &NormalizedPath) -> Result<Self> {
        if url == "sqlite::memory:" || url == ":memory:" {
            return Ok(Self::Memory);
        }

        let path = match url.split_once("://") {
            Some(("sqlite", path)) => path,
            Some((scheme, _)) => {
                return Err(Error::Config {
                    message: format!("unsupported database scheme '{}' in '{}'", scheme, url),
                });
            }
            None => url,
        };
        if path.is_empty() {
            return Err(Error::Config {
                message: format!("database url '{}' has no path", url),
            });
        }

        if std::path::Path::new(path).is_absolute() {
            Ok(Self::File(NormalizedPath::new(path)))
        } else {
            Ok(Self::File(base.join(path)))
        }
    }
}

/// Record store in a SQLite database.
///
/// The connection is opened by [`RecordStore::connect`] and shared by all
/// workers behind a mutex.
pub struct SqliteRecordStore {
    location: DatabaseLocation,
    conn: Mutex<Option<Connection>>,
}

impl SqliteRecordStore {
    pub fn new(location: DatabaseLocation) -> Self {
        Self {
            location,
            conn: Mutex::new(None),
        }
    }

    /// A connected in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self::new(DatabaseLocation::Memory);
        store.connect()?;
        Ok(store)
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    fn open(&self) -> Result<Connection> {
        let conn = match &self.location {
            DatabaseLocation::Memory => Connection::open_in_memory()
                .map_err(|e| Error::database("failed to open in-memory database", e))?,
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    let native = parent.to_native();
                    fs::create_dir_all(&native).map_err(|e| docsync_fs::Error::io(&native, e))?;
                }
                Connection::open(path.to_native()).map_err(|e| {
                    Error::database(&format!("failed to open database {}", path), e)
                })?
            }
        };

        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {HISTORY_TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                table_name TEXT NOT NULL,
                attempted INTEGER NOT NULL,
                written INTEGER NOT NULL,
                skipped INTEGER NOT NULL,
                failed INTEGER NOT NULL,
                cancelled INTEGER NOT NULL,
                outcome TEXT NOT NULL,
                error TEXT
            );
            "
        ))
        .map_err(|e| Error::database("failed to init history schema", e))?;
        Ok(conn)
    }

    fn with_conn<T>(
        &self,
        context: &str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        match guard.as_ref() {
            Some(conn) => f(conn).map_err(|e| Error::database(context, e)),
            None => Err(Error::database(context, "not connected")),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordStore for SqliteRecordStore {
    fn connect(&self) -> Result<()> {
        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
            tracing::debug!(location = ?self.location, "Connected to record store");
        }
        Ok(())
    }

    fn ensure_table(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;
        self.with_conn("failed to create record table", |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" (
                    key TEXT PRIMARY KEY,
                    payload TEXT NOT NULL,
                    checksum TEXT NOT NULL,
                    last_synced_at TEXT NOT NULL
                );"
            ))
        })
    }

    fn last_synced_checksum(&self, table: &str, key: &str) -> Result<Option<String>> {
        validate_table_name(table)?;
        self.with_conn("failed to read last synced checksum", |conn| {
            conn.query_row(
                &format!("SELECT checksum FROM \"{table}\" WHERE key = ?1"),
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn upsert(&self, table: &str, record: &SyncRecord) -> Result<()> {
        validate_table_name(table)?;
        let payload = serde_json::to_string(&record.payload)?;
        self.with_conn("failed to upsert record", |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO \"{table}\" (key, payload, checksum, last_synced_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO UPDATE SET
                        payload = excluded.payload,
                        checksum = excluded.checksum,
                        last_synced_at = excluded.last_synced_at"
                ),
                params![
                    record.key,
                    payload,
                    record.checksum,
                    format_time(&record.last_synced_at)
                ],
            )
            .map(|_| ())
        })
    }

    fn get_record(&self, table: &str, key: &str) -> Result<Option<SyncRecord>> {
        validate_table_name(table)?;
        let row = self.with_conn("failed to read record", |conn| {
            conn.query_row(
                &format!(
                    "SELECT key, payload, checksum, last_synced_at FROM \"{table}\" WHERE key = ?1"
                ),
                params![key],
                record_columns,
            )
            .optional()
        })?;
        row.map(record_from_columns).transpose()
    }

    fn export(&self, table: &str) -> Result<Vec<SyncRecord>> {
        validate_table_name(table)?;
        let rows = self.with_conn("failed to export records", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT key, payload, checksum, last_synced_at FROM \"{table}\" ORDER BY key"
            ))?;
            let rows = stmt.query_map([], record_columns)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        rows.into_iter().map(record_from_columns).collect()
    }

    fn append_history(&self, entry: &SyncHistoryEntry) -> Result<()> {
        self.with_conn("failed to append sync history", |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {HISTORY_TABLE} (run_id, sequence, started_at, timestamp, table_name,
                        attempted, written, skipped, failed, cancelled, outcome, error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    entry.run_id.to_string(),
                    entry.sequence as i64,
                    format_time(&entry.started_at),
                    format_time(&entry.timestamp),
                    entry.table_name,
                    entry.attempted as i64,
                    entry.written as i64,
                    entry.skipped as i64,
                    entry.failed as i64,
                    entry.cancelled as i64,
                    entry.outcome.as_str(),
                    entry.error,
                ],
            )
            .map(|_| ())
        })
    }

    fn history(&self, table: Option<&str>) -> Result<Vec<SyncHistoryEntry>> {
        let rows = self.with_conn("failed to read sync history", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT run_id, sequence, started_at, timestamp, table_name, attempted, written,
                        skipped, failed, cancelled, outcome, error
                 FROM {HISTORY_TABLE}
                 WHERE ?1 IS NULL OR table_name = ?1
                 ORDER BY started_at, sequence"
            ))?;
            let rows = stmt.query_map(params![table], |row| {
                Ok(HistoryColumns {
                    run_id: row.get(0)?,
                    sequence: row.get(1)?,
                    started_at: row.get(2)?,
                    timestamp: row.get(3)?,
                    table_name: row.get(4)?,
                    counts: [row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?],
                    outcome: row.get(10)?,
                    error: row.get(11)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        rows.into_iter().map(HistoryColumns::into_entry).collect()
    }
}

type RecordColumns = (String, String, String, String);

fn record_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordColumns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn record_from_columns((key, payload, checksum, synced): RecordColumns) -> Result<SyncRecord> {
    Ok(SyncRecord {
        payload: serde_json::from_str(&payload)?,
        last_synced_at: parse_time(&synced)?,
        key,
        checksum,
    })
}

struct HistoryColumns {
    run_id: String,
    sequence: i64,
    started_at: String,
    timestamp: String,
    table_name: String,
    counts: [i64; 5],
    outcome: String,
    error: Option<String>,
}

impl HistoryColumns {
    fn into_entry(self) -> Result<SyncHistoryEntry> {
        let run_id = Uuid::parse_str(&self.run_id)
            .map_err(|e| Error::database("invalid run id in sync history", e))?;
        let outcome = SyncOutcome::parse(&self.outcome).ok_or_else(|| {
            Error::database("invalid outcome in sync history", &self.outcome)
        })?;
        let [attempted, written, skipped, failed, cancelled] = self.counts.map(|n| n.max(0) as u64);

        Ok(SyncHistoryEntry {
            sequence: self.sequence.max(0) as u64,
            run_id,
            started_at: parse_time(&self.started_at)?,
            timestamp: parse_time(&self.timestamp)?,
            table_name: self.table_name,
            attempted,
            written,
            skipped,
            failed,
            cancelled,
            outcome,
            error: self.error,
        })
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::database(&format!("invalid timestamp '{}'", text), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(key: &str, checksum: &str) -> SyncRecord {
        SyncRecord {
            key: key.to_string(),
            payload: json!({"key": key}),
            checksum: checksum.to_string(),
            last_synced_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.ensure_table("json_records").unwrap();

        store.upsert("json_records", &record("a.json", "sha256:1")).unwrap();
        store.upsert("json_records", &record("a.json", "sha256:2")).unwrap();

        assert_eq!(
            store.last_synced_checksum("json_records", "a.json").unwrap(),
            Some("sha256:2".to_string())
        );
        assert_eq!(store.export("json_records").unwrap().len(), 1);
    }

    #[test]
    fn unknown_key_has_no_checksum() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.ensure_table("t").unwrap();
        assert_eq!(store.last_synced_checksum("t", "x.json").unwrap(), None);
        assert_eq!(store.get_record("t", "x.json").unwrap(), None);
    }

    #[test]
    fn export_is_sorted_by_key() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.ensure_table("t").unwrap();
        store.upsert("t", &record("b.json", "sha256:b")).unwrap();
        store.upsert("t", &record("a.json", "sha256:a")).unwrap();

        let keys: Vec<_> = store.export("t").unwrap().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["a.json", "b.json"]);
    }

    #[test]
    fn history_round_trips_and_filters() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let started = Utc::now();
        for (sequence, table) in [(1, "a"), (2, "b")] {
            store
                .append_history(&SyncHistoryEntry {
                    sequence,
                    run_id: Uuid::new_v4(),
                    started_at: started,
                    timestamp: started,
                    table_name: table.to_string(),
                    attempted: 3,
                    written: 2,
                    skipped: 0,
                    failed: 1,
                    cancelled: 0,
                    outcome: SyncOutcome::Partial,
                    error: Some("x.json: boom".into()),
                })
                .unwrap();
        }

        assert_eq!(store.history(None).unwrap().len(), 2);
        let only_b = store.history(Some("b")).unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].outcome, SyncOutcome::Partial);
        assert_eq!(only_b[0].failed, 1);
    }

    #[test]
    fn parses_database_urls() {
        let base = NormalizedPath::new("/data/.docsync");
        assert_eq!(
            DatabaseLocation::parse("sqlite::memory:", &base).unwrap(),
            DatabaseLocation::Memory
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite://records.db", &base).unwrap(),
            DatabaseLocation::File(NormalizedPath::new("/data/.docsync/records.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("/var/db/x.db", &base).unwrap(),
            DatabaseLocation::File(NormalizedPath::new("/var/db/x.db"))
        );
        assert!(matches!(
            DatabaseLocation::parse("postgres://localhost/db", &base),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn unreachable_database_fails_to_connect() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file
        let store = SqliteRecordStore::new(DatabaseLocation::File(NormalizedPath::new(dir.path())));
        assert!(store.connect().is_err());
    }
}
