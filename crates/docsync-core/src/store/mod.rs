//! Document store over a flat directory of JSON files
//!
//! Every top-level `*.json` file in the data directory is a document. Writes
//! go through `docsync_fs::io::write_atomic`, so a reader never sees a
//! partially written file, and are serialized per document name.
//!
//! A store-wide gate sits in front of every operation: ordinary reads and
//! writes share it, while snapshotting and restoring take it exclusively so
//! that a restore is observed all at once or not at all.

mod merge;
mod stats;

pub use merge::MergeReport;
pub use stats::{FileStat, SearchHit, Statistics};

use std::collections::HashSet;
use std::fs;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use docsync_fs::{
    NormalizedPath, RobustnessConfig, compute_value_checksum, io, validate_document_name,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::shape_of;
use crate::locks::KeyedLocks;
use crate::{Error, Result};

/// JSON configuration file that shares the directory with documents.
const CONFIG_DOCUMENT: &str = "docsync.json";

/// Metadata of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub name: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
    /// Content-addressed checksum of the parsed value
    pub checksum: String,
}

/// A named JSON value read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub value: Value,
    pub meta: DocumentMeta,
}

impl Document {
    pub fn name(&self) -> &str {
        &self.meta.name
    }
}

/// Reads and writes documents in one directory.
#[derive(Debug)]
pub struct DocumentStore {
    root: NormalizedPath,
    robustness: RobustnessConfig,
    gate: RwLock<()>,
    names: KeyedLocks,
}

impl DocumentStore {
    pub fn new(root: NormalizedPath) -> Self {
        Self::with_robustness(root, RobustnessConfig::default())
    }

    pub fn with_robustness(root: NormalizedPath, robustness: RobustnessConfig) -> Self {
        Self {
            root,
            robustness,
            gate: RwLock::new(()),
            names: KeyedLocks::new(),
        }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// Read a document.
    ///
    /// # Errors
    ///
    /// [`Error::DocumentNotFound`] if it does not exist, [`Error::InvalidJson`]
    /// if the file does not parse.
    pub fn read(&self, name: &str) -> Result<Document> {
        let _gate = self.shared();
        self.read_unlocked(name)
    }

    /// Create or replace a document. The value must be an object or a list.
    pub fn write(&self, name: &str, value: &Value) -> Result<DocumentMeta> {
        let path = self.path_for(name)?;
        if !value.is_object() && !value.is_array() {
            return Err(Error::UnsupportedShape {
                document: name.to_string(),
                expected: "an object or a list".into(),
                found: shape_of(value),
            });
        }

        let mut rendered = serde_json::to_string_pretty(value)?;
        rendered.push('\n');

        let _gate = self.shared();
        let _name = self.names.lock(name);
        io::write_atomic(&path, rendered.as_bytes(), self.robustness)?;

        let meta = self.meta_for(name, &path, value)?;
        tracing::debug!(document = %name, checksum = %meta.checksum, "Wrote document");
        Ok(meta)
    }

    /// Delete a document.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;

        let _gate = self.shared();
        let _name = self.names.lock(name);
        if !path.is_file() {
            return Err(Error::DocumentNotFound {
                name: name.to_string(),
            });
        }
        io::remove_locked(&path, self.robustness)?;
        tracing::debug!(document = %name, "Deleted document");
        Ok(())
    }

    /// Names of all documents, ascending.
    pub fn list(&self) -> Result<Vec<String>> {
        let _gate = self.shared();
        self.list_unlocked()
    }

    /// Raw contents of every document, taken while no write is in progress.
    pub(crate) fn snapshot(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let _gate = self.exclusive();
        self.capture()
    }

    /// Replace the whole store with `contents`.
    ///
    /// Documents absent from `contents` are removed. If any step fails, the
    /// previous contents are put back before the error is returned.
    pub(crate) fn replace_all(&self, contents: &[(String, Vec<u8>)]) -> Result<()> {
        let _gate = self.exclusive();
        let previous = self.capture()?;

        if let Err(err) = self.apply(contents) {
            tracing::warn!("Restore failed, rolling back: {}", err);
            if let Err(rollback) = self.apply(&previous) {
                tracing::error!("Rollback failed: {}", rollback);
            }
            return Err(err);
        }
        Ok(())
    }

    fn capture(&self) -> Result<Vec<(String, Vec<u8>)>> {
        self.list_unlocked()?
            .into_iter()
            .map(|name| {
                let bytes = io::read_bytes(&self.root.join(&name))?;
                Ok((name, bytes))
            })
            .collect()
    }

    fn apply(&self, contents: &[(String, Vec<u8>)]) -> Result<()> {
        for (name, bytes) in contents {
            let path = self.path_for(name)?;
            io::write_atomic(&path, bytes, self.robustness)?;
        }

        let keep: HashSet<&str> = contents.iter().map(|(name, _)| name.as_str()).collect();
        for name in self.list_unlocked()? {
            if !keep.contains(name.as_str()) {
                io::remove_locked(&self.root.join(&name), self.robustness)?;
            }
        }
        Ok(())
    }

    fn read_unlocked(&self, name: &str) -> Result<Document> {
        let path = self.path_for(name)?;
        let bytes = io::read_bytes(&path).map_err(|e| {
            if e.is_not_found() {
                Error::DocumentNotFound {
                    name: name.to_string(),
                }
            } else {
                e.into()
            }
        })?;

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| Error::InvalidJson {
            document: name.to_string(),
            message: e.to_string(),
        })?;

        let meta = self.meta_for(name, &path, &value)?;
        Ok(Document { value, meta })
    }

    pub(crate) fn list_unlocked(&self) -> Result<Vec<String>> {
        let dir = self.root.to_native();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| docsync_fs::Error::io(&dir, e))? {
            let entry = entry.map_err(|e| docsync_fs::Error::io(&dir, e))?;
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && name != CONFIG_DOCUMENT
                && validate_document_name(name).is_ok()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn path_for(&self, name: &str) -> Result<NormalizedPath> {
        validate_document_name(name).map_err(|message| Error::InvalidDocumentName { message })?;
        Ok(self.root.join(name))
    }

    fn meta_for(&self, name: &str, path: &NormalizedPath, value: &Value) -> Result<DocumentMeta> {
        let native = path.to_native();
        let metadata = fs::metadata(&native).map_err(|e| docsync_fs::Error::io(&native, e))?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| docsync_fs::Error::io(&native, e))?;

        Ok(DocumentMeta {
            name: name.to_string(),
            size_bytes: metadata.len(),
            modified,
            checksum: compute_value_checksum(value),
        })
    }

    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
