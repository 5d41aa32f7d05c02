//! Engine configuration
//!
//! Configuration is resolved from, in increasing precedence:
//! 1. Built-in defaults
//! 2. `docsync.toml`, `docsync.json` or `docsync.yaml` in the data directory
//! 3. `docsync.local.toml` (local overrides, merged over the base file)
//! 4. Environment: `DATABASE_URL`, `DOCSYNC_WORKERS`
//!
//! Files may be partial; objects are merged key by key and everything else
//! is replaced.

mod resolver;

pub use resolver::ConfigResolver;

use serde::{Deserialize, Serialize};

use crate::records::DEFAULT_TABLE;
use crate::sync::MAX_WORKERS;

/// Where documents, schemas and engine state live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Schema directory, relative to the data directory
    pub schema_dir: String,
    /// Engine state directory, relative to the data directory
    pub state_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            schema_dir: "schemas".to_string(),
            state_dir: ".docsync".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite://<path>`, `sqlite::memory:` or a path; defaults to
    /// `<state_dir>/records.db`
    pub url: Option<String>,
    /// Table synced into when no table is given
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub workers: usize,
    /// Take a backup before every sync run
    pub backup_before_sync: bool,
    /// Which documents take part in a sync
    pub pattern: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            backup_before_sync: false,
            pattern: "*.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Take a safety backup of the current state before restoring
    pub backup_before_restore: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            backup_before_restore: true,
        }
    }
}

/// Declares the schema for documents matching `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBinding {
    pub pattern: String,
    pub schema: String,
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub restore: RestoreConfig,
    pub bindings: Vec<SchemaBinding>,
}

impl EngineConfig {
    /// Worker count clamped to the supported range.
    pub fn effective_workers(&self) -> usize {
        self.sync.workers.clamp(1, MAX_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.store.schema_dir, "schemas");
        assert_eq!(config.database.table, "json_records");
        assert_eq!(config.sync.workers, 4);
        assert!(config.restore.backup_before_restore);
        assert!(!config.sync.backup_before_sync);
    }

    #[test]
    fn workers_are_clamped() {
        let mut config = EngineConfig::default();
        config.sync.workers = 0;
        assert_eq!(config.effective_workers(), 1);
        config.sync.workers = 500;
        assert_eq!(config.effective_workers(), MAX_WORKERS);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [sync]
            workers = 8

            [[bindings]]
            pattern = "users_*.json"
            schema = "user"
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.workers, 8);
        assert_eq!(config.sync.pattern, "*.json");
        assert_eq!(config.bindings.len(), 1);
        assert_eq!(config.database.table, "json_records");
    }
}
