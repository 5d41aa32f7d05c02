//! Named schema registry
//!
//! Schemas are stored behind `Arc` so lookups hand out snapshots: a
//! validation that already fetched a schema keeps using that version even
//! if the name is redefined concurrently.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use docsync_fs::{NormalizedPath, RobustnessConfig, io, validate_path_identifier};
use serde_json::Value;

use crate::loader::SchemaLoader;
use crate::{Error, Result, Schema};

/// Registry of named schemas.
///
/// When opened on a directory, registrations are persisted there as
/// `<name>.json` so they survive restarts.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<BTreeMap<String, Arc<Schema>>>,
    dir: Option<NormalizedPath>,
}

impl SchemaRegistry {
    /// Create an empty in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a registry backed by `dir`, loading every schema found there.
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn open(dir: &NormalizedPath) -> Result<Self> {
        let loaded = SchemaLoader::new().load_dir(dir)?;
        tracing::debug!(dir = %dir, count = loaded.len(), "Loaded schemas");

        let schemas = loaded
            .into_iter()
            .map(|schema| (schema.name().to_string(), Arc::new(schema)))
            .collect();

        Ok(Self {
            schemas: RwLock::new(schemas),
            dir: Some(dir.clone()),
        })
    }

    /// Register (or redefine) a schema.
    ///
    /// The definition is checked for well-formedness before anything is
    /// stored; on failure the registry is unchanged.
    pub fn register(&self, name: &str, definition: Value) -> Result<Arc<Schema>> {
        validate_path_identifier(name, "Schema name").map_err(|msg| Error::definition(name, msg))?;
        let schema = Arc::new(Schema::from_value(name, definition)?);

        // file and map are updated under one guard
        let mut schemas = self.write();
        if let Some(dir) = &self.dir {
            let rendered = serde_json::to_string_pretty(schema.source())
                .map_err(|e| Error::definition(name, e.to_string()))?;
            let path = dir.join(&format!("{}.json", name));
            io::write_atomic(&path, rendered.as_bytes(), RobustnessConfig::default())?;
        }

        let replaced = schemas
            .insert(name.to_string(), Arc::clone(&schema))
            .is_some();
        drop(schemas);
        tracing::info!(schema = name, replaced, "Registered schema");
        Ok(schema)
    }

    /// Fetch a snapshot of the named schema.
    pub fn get(&self, name: &str) -> Result<Arc<Schema>> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SchemaNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Names of all registered schemas, in ascending order.
    pub fn list(&self) -> SchemaNames {
        let names: Arc<[String]> = self.read().keys().cloned().collect();
        SchemaNames { names, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<Schema>>> {
        self.schemas.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<Schema>>> {
        self.schemas.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Restartable iterator over a snapshot of schema names.
///
/// Registrations made after [`SchemaRegistry::list`] returned are not seen.
#[derive(Debug, Clone)]
pub struct SchemaNames {
    names: Arc<[String]>,
    pos: usize,
}

impl SchemaNames {
    /// Start again from the first name.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl Iterator for SchemaNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let name = self.names.get(self.pos)?.clone();
        self.pos += 1;
        Some(name)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.names.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SchemaNames {}
