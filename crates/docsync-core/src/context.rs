//! The engine context
//!
//! [`Engine`] owns every subsystem for one data directory and exposes the
//! operations front ends call. Each method maps onto exactly one core
//! operation and returns the core's error kinds unchanged.

use std::sync::Arc;

use docsync_fs::{GlobPattern, NormalizedPath, RobustnessConfig, StatePath};
use docsync_schema::{SchemaNames, SchemaRegistry, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backup::{BackupManager, BackupManifest, RestoreReport};
use crate::config::{ConfigResolver, EngineConfig};
use crate::error::shape_of;
use crate::history::{HistoryLedger, SyncHistoryEntry};
use crate::locks::KeyedLocks;
use crate::records::{DatabaseLocation, RecordStore, SqliteRecordStore, validate_table_name};
use crate::store::{Document, DocumentMeta, DocumentStore, MergeReport, SearchHit, Statistics};
use crate::sync::{SyncEngine, SyncOptions, SyncReport, WorkerPool};
use crate::transform::{TransformEngine, TransformReport, TransformRequest};
use crate::validate::{SchemaBindings, ValidationSummary, validate_all};
use crate::{Error, Result};

/// Result of exporting a table into a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub table: String,
    pub records: usize,
    pub output: DocumentMeta,
}

/// Everything needed to operate on one data directory.
pub struct Engine {
    root: NormalizedPath,
    config: EngineConfig,
    store: DocumentStore,
    registry: SchemaRegistry,
    bindings: SchemaBindings,
    backups: BackupManager,
    records: Arc<dyn RecordStore>,
    ledger: HistoryLedger,
    table_locks: KeyedLocks,
    sync_pattern: GlobPattern,
    robustness: RobustnessConfig,
}

impl Engine {
    /// Open a data directory, resolving its configuration.
    pub fn open(data_dir: impl AsRef<std::path::Path>) -> Result<Self> {
        let root = NormalizedPath::new(data_dir);
        let config = ConfigResolver::new(root.clone()).resolve()?;
        Self::open_with(root, config)
    }

    /// Open a data directory with an explicit configuration.
    pub fn open_with(root: NormalizedPath, config: EngineConfig) -> Result<Self> {
        let location = match &config.database.url {
            Some(url) => DatabaseLocation::parse(url, &root)?,
            None => DatabaseLocation::File(
                root.join(&config.store.state_dir)
                    .join(StatePath::Records.as_str()),
            ),
        };
        let records = Arc::new(SqliteRecordStore::new(location));
        Self::with_record_store(root, config, records)
    }

    /// Open a data directory against a caller-supplied record store.
    pub fn with_record_store(
        root: NormalizedPath,
        config: EngineConfig,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        let robustness = RobustnessConfig::default();
        let state = root.join(&config.store.state_dir);
        let registry = SchemaRegistry::open(&root.join(&config.store.schema_dir))?;
        let bindings = SchemaBindings::new(&config.bindings)?;
        let sync_pattern = GlobPattern::new(&config.sync.pattern)?;

        tracing::debug!(
            root = %root,
            schemas = registry.len(),
            bindings = config.bindings.len(),
            "Opened data directory"
        );

        Ok(Self {
            store: DocumentStore::with_robustness(root.clone(), robustness),
            backups: BackupManager::with_robustness(
                state.join(StatePath::Backups.as_str()),
                robustness,
            ),
            ledger: HistoryLedger::with_robustness(
                state.join(StatePath::History.as_str()),
                robustness,
            ),
            table_locks: KeyedLocks::new(),
            root,
            config,
            registry,
            bindings,
            records,
            sync_pattern,
            robustness,
        })
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    // Documents

    pub fn read(&self, name: &str) -> Result<Document> {
        self.store.read(name)
    }

    pub fn write(&self, name: &str, value: &Value) -> Result<DocumentMeta> {
        self.store.write(name, value)
    }

    /// Write only if the value satisfies the document's declared schema.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] with the failing field; the store is untouched.
    pub fn write_validated(&self, name: &str, value: &Value) -> Result<DocumentMeta> {
        if let Some(schema) = self.bindings.resolve(name, &self.registry) {
            let result = Validator::new(&self.registry).validate(value, &schema)?;
            if let Some(error) = result.error {
                return Err(Error::Validation {
                    document: name.to_string(),
                    schema,
                    error,
                });
            }
        }
        self.store.write(name, value)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.store.delete(name)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    pub fn merge(&self, pattern: &str, destination: &str) -> Result<MergeReport> {
        self.store.merge(pattern, destination)
    }

    pub fn transform(&self, request: &TransformRequest) -> Result<TransformReport> {
        TransformEngine::new(&self.store).apply(request)
    }

    pub fn statistics(&self) -> Result<Statistics> {
        self.store.statistics()
    }

    pub fn search(&self, query: &str, field: Option<&str>) -> Result<Vec<SearchHit>> {
        self.store.search(query, field)
    }

    // Schemas

    /// Validate every document against its declared schema.
    pub fn validate_all(&self) -> Result<ValidationSummary> {
        validate_all(
            &self.store,
            &self.registry,
            &self.bindings,
            WorkerPool::new(self.config.effective_workers()),
        )
    }

    pub fn register_schema(&self, name: &str, definition: Value) -> Result<()> {
        self.registry.register(name, definition)?;
        Ok(())
    }

    pub fn schemas(&self) -> SchemaNames {
        self.registry.list()
    }

    /// Infer a schema from the document `name`.
    pub fn infer_schema(&self, name: &str, require_present: bool) -> Result<Value> {
        let doc = self.store.read(name)?;
        if !doc.value.is_object() && !doc.value.is_array() {
            return Err(Error::UnsupportedShape {
                document: name.to_string(),
                expected: "an object or a list".into(),
                found: shape_of(&doc.value),
            });
        }
        Ok(docsync_schema::infer_schema(&doc.value, require_present))
    }

    // Backups

    pub fn create_backup(&self) -> Result<BackupManifest> {
        self.backups.create(&self.store)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupManifest>> {
        self.backups.list()
    }

    /// Restore backup `version`, first taking a safety backup when configured.
    pub fn restore(&self, version: u64) -> Result<RestoreReport> {
        // Fail before the safety backup when the version does not exist
        self.backups.manifest(version)?;
        if self.config.restore.backup_before_restore {
            let safety = self.backups.create(&self.store)?;
            tracing::info!(version = safety.version, "Created safety backup before restore");
        }
        self.backups.restore(&self.store, version)
    }

    // Sync

    /// Sync into the configured default table.
    pub fn sync_default(&self) -> Result<SyncReport> {
        let table = self.config.database.table.clone();
        self.sync(&table)
    }

    pub fn sync(&self, table: &str) -> Result<SyncReport> {
        self.sync_with(table, &SyncOptions::default())
    }

    pub fn sync_with(&self, table: &str, options: &SyncOptions) -> Result<SyncReport> {
        validate_table_name(table)?;
        if self.config.sync.backup_before_sync {
            let backup = self.backups.create(&self.store)?;
            tracing::info!(version = backup.version, table, "Created backup before sync");
        }

        SyncEngine {
            store: &self.store,
            registry: &self.registry,
            bindings: &self.bindings,
            records: self.records.as_ref(),
            ledger: &self.ledger,
            table_locks: &self.table_locks,
            locks_dir: self
                .root
                .join(&self.config.store.state_dir)
                .join(StatePath::Locks.as_str()),
            pattern: &self.sync_pattern,
            workers: self.config.effective_workers(),
            robustness: self.robustness,
        }
        .run(table, options)
    }

    /// Recorded sync runs, from the local ledger.
    pub fn history(&self, table: Option<&str>) -> Result<Vec<SyncHistoryEntry>> {
        self.ledger.entries(table)
    }

    /// Write every record of `table` into the list document `output`.
    pub fn export(&self, table: &str, output: &str) -> Result<ExportReport> {
        validate_table_name(table)?;
        self.records
            .connect()
            .and_then(|()| self.records.ensure_table(table))
            .map_err(|e| Error::SyncConnection {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        let records = self.records.export(table)?;
        let rows = records
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let meta = self.store.write(output, &Value::Array(rows))?;

        tracing::info!(table, output, records = records.len(), "Exported records");
        Ok(ExportReport {
            table: table.to_string(),
            records: records.len(),
            output: meta,
        })
    }
}
