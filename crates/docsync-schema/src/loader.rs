//! Loader for schema definitions stored on disk
//!
//! ```text
//! schemas/
//!   user.json
//!   order.json
//! ```
//!
//! The file stem is the schema name.

use std::fs;

use docsync_fs::{ConfigStore, NormalizedPath};
use serde_json::Value;

use crate::{Error, Result, Schema};

/// Loads schema definitions from a directory.
pub struct SchemaLoader {
    store: ConfigStore,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self {
            store: ConfigStore::new(),
        }
    }

    /// Load a single schema file.
    pub fn load_file(&self, path: &NormalizedPath) -> Result<Schema> {
        let name = path.file_stem().unwrap_or_default().to_string();
        let definition: Value = self.store.load(path)?;
        Schema::from_value(&name, definition)
    }

    /// Load every `*.json` schema in `dir`, sorted by name.
    ///
    /// A missing directory yields no schemas. Malformed files are logged and
    /// skipped so one bad definition does not hide the rest.
    pub fn load_dir(&self, dir: &NormalizedPath) -> Result<Vec<Schema>> {
        let mut schemas = Vec::new();

        if !dir.is_dir() {
            return Ok(schemas);
        }

        let entries = fs::read_dir(dir.to_native())
            .map_err(|e| Error::Fs(docsync_fs::Error::io(dir.to_native(), e)))?;

        for entry in entries.flatten() {
            let path = NormalizedPath::new(entry.path());
            if path.extension() != Some("json") || !path.is_file() {
                continue;
            }
            match self.load_file(&path) {
                Ok(schema) => schemas.push(schema),
                Err(e) => {
                    tracing::warn!("Skipping schema {}: {}", path, e);
                }
            }
        }

        schemas.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(schemas)
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new()
    }
}
