//! Snapshot creation, listing and restore

use std::fs;

use chrono::{DateTime, Utc};
use docsync_fs::{NormalizedPath, RobustnessConfig, compute_bytes_checksum, io};
use serde::{Deserialize, Serialize};

use crate::store::DocumentStore;
use crate::{Error, Result};

const MANIFEST: &str = "manifest.json";
const HIGH_WATER: &str = "HIGH_WATER";

/// One document inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub name: String,
    /// Checksum of the file bytes as they were snapshotted
    pub checksum: String,
    pub size_bytes: u64,
}

/// Description of one backup version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub version: u64,
    pub created: DateTime<Utc>,
    pub documents: Vec<BackupEntry>,
}

/// Outcome of a restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    pub version: u64,
    pub restored: Vec<String>,
}

/// Manages backup versions in one directory
pub struct BackupManager {
    backups_dir: NormalizedPath,
    robustness: RobustnessConfig,
}

impl BackupManager {
    pub fn new(backups_dir: NormalizedPath) -> Self {
        Self::with_robustness(backups_dir, RobustnessConfig::default())
    }

    pub fn with_robustness(backups_dir: NormalizedPath, robustness: RobustnessConfig) -> Self {
        Self {
            backups_dir,
            robustness,
        }
    }

    fn version_dir(&self, version: u64) -> NormalizedPath {
        self.backups_dir.join(&format!("v{:06}", version))
    }

    /// Snapshot every document in `store` under the next version number.
    ///
    /// The snapshot is assembled in a staging directory and published with
    /// a single rename, so a version directory is either complete or absent.
    pub fn create(&self, store: &DocumentStore) -> Result<BackupManifest> {
        let backups = self.backups_dir.to_native();
        fs::create_dir_all(&backups).map_err(|e| docsync_fs::Error::io(&backups, e))?;

        // Serializes version assignment across processes
        let _lock = io::acquire_lock(
            &backups.join(".lock"),
            self.robustness.lock_timeout,
        )?;

        let version = self.highest_assigned()? + 1;
        let contents = store.snapshot()?;

        let manifest = BackupManifest {
            version,
            created: Utc::now(),
            documents: contents
                .iter()
                .map(|(name, bytes)| BackupEntry {
                    name: name.clone(),
                    checksum: compute_bytes_checksum(bytes),
                    size_bytes: bytes.len() as u64,
                })
                .collect(),
        };

        // Claim the number before publishing; a crash in between only skips it
        io::write_atomic(
            &self.backups_dir.join(HIGH_WATER),
            version.to_string().as_bytes(),
            self.robustness,
        )?;

        let staging = backups.join(format!(".staging-{}", uuid::Uuid::new_v4()));
        let staged = stage(&staging, &contents, &manifest);
        let published = staged.and_then(|()| {
            let target = self.version_dir(version).to_native();
            fs::rename(&staging, &target)
                .map_err(|e| Error::from(docsync_fs::Error::io(&target, e)))
        });
        if published.is_err() {
            let _ = fs::remove_dir_all(&staging);
        }
        published?;

        tracing::info!(version, documents = manifest.documents.len(), "Created backup");
        Ok(manifest)
    }

    /// All readable backups, in version order.
    pub fn list(&self) -> Result<Vec<BackupManifest>> {
        let dir = self.backups_dir.to_native();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut manifests = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| docsync_fs::Error::io(&dir, e))? {
            let entry = entry.map_err(|e| docsync_fs::Error::io(&dir, e))?;
            let Some(version) = entry.file_name().to_str().and_then(parse_version_dir) else {
                continue;
            };
            match self.manifest(version) {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => tracing::warn!(version, "Skipping unreadable backup: {}", e),
            }
        }
        manifests.sort_by_key(|m| m.version);
        Ok(manifests)
    }

    /// Load the manifest of one version.
    pub fn manifest(&self, version: u64) -> Result<BackupManifest> {
        let path = self.version_dir(version).join(MANIFEST);
        if !path.is_file() {
            return Err(Error::BackupNotFound { version });
        }
        let content = io::read_text(&path)?;
        serde_json::from_str(&content).map_err(|e| Error::BackupCorrupted {
            version,
            message: format!("unreadable manifest: {}", e),
        })
    }

    /// Replace the store contents with backup `version`.
    ///
    /// Every snapshot file is checked against its manifest checksum before
    /// the store is touched; the replacement itself is all-or-nothing.
    pub fn restore(&self, store: &DocumentStore, version: u64) -> Result<RestoreReport> {
        let manifest = self.manifest(version)?;
        let dir = self.version_dir(version);

        let mut contents = Vec::with_capacity(manifest.documents.len());
        for entry in &manifest.documents {
            let bytes = io::read_bytes(&dir.join(&entry.name)).map_err(|e| Error::BackupCorrupted {
                version,
                message: format!("{}: {}", entry.name, e),
            })?;
            if compute_bytes_checksum(&bytes) != entry.checksum {
                return Err(Error::BackupCorrupted {
                    version,
                    message: format!("checksum mismatch for {}", entry.name),
                });
            }
            contents.push((entry.name.clone(), bytes));
        }

        store.replace_all(&contents)?;
        tracing::info!(version, documents = contents.len(), "Restored backup");

        Ok(RestoreReport {
            version,
            restored: contents.into_iter().map(|(name, _)| name).collect(),
        })
    }

    /// Highest version ever assigned: the larger of the high-water mark and
    /// any version directory present.
    fn highest_assigned(&self) -> Result<u64> {
        let mark_path = self.backups_dir.join(HIGH_WATER);
        let mark = if mark_path.is_file() {
            let text = io::read_text(&mark_path)?;
            text.trim().parse::<u64>().map_err(|e| Error::BackupCorrupted {
                version: 0,
                message: format!("invalid {} file: {}", HIGH_WATER, e),
            })?
        } else {
            0
        };

        let dir = self.backups_dir.to_native();
        let present = fs::read_dir(&dir)
            .map_err(|e| docsync_fs::Error::io(&dir, e))?
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_version_dir))
            .max()
            .unwrap_or(0);

        Ok(mark.max(present))
    }
}

fn stage(
    staging: &std::path::Path,
    contents: &[(String, Vec<u8>)],
    manifest: &BackupManifest,
) -> Result<()> {
    fs::create_dir_all(staging).map_err(|e| docsync_fs::Error::io(staging, e))?;
    for (name, bytes) in contents {
        let path = staging.join(name);
        fs::write(&path, bytes).map_err(|e| docsync_fs::Error::io(&path, e))?;
    }
    let path = staging.join(MANIFEST);
    fs::write(&path, serde_json::to_vec_pretty(manifest)?)
        .map_err(|e| docsync_fs::Error::io(&path, e))?;
    Ok(())
}

fn parse_version_dir(name: &str) -> Option<u64> {
    let digits = name.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn setup() -> (TempDir, DocumentStore, BackupManager) {
        let dir = tempdir().unwrap();
        let root = NormalizedPath::new(dir.path());
        let store = DocumentStore::new(root.clone());
        let backups = BackupManager::new(root.join(".docsync").join("backups"));
        (dir, store, backups)
    }

    #[test]
    fn versions_start_at_one_and_increase() {
        let (_dir, store, backups) = setup();
        store.write("a.json", &json!({"n": 1})).unwrap();

        assert_eq!(backups.create(&store).unwrap().version, 1);
        assert_eq!(backups.create(&store).unwrap().version, 2);

        let versions: Vec<_> = backups.list().unwrap().iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn versions_are_never_reused() {
        let (dir, store, backups) = setup();
        backups.create(&store).unwrap();
        backups.create(&store).unwrap();

        fs::remove_dir_all(dir.path().join(".docsync/backups/v000002")).unwrap();
        assert_eq!(backups.create(&store).unwrap().version, 3);
    }

    #[test]
    fn restore_unknown_version() {
        let (_dir, store, backups) = setup();
        assert!(matches!(
            backups.restore(&store, 9),
            Err(Error::BackupNotFound { version: 9 })
        ));
    }

    #[test]
    fn corrupted_snapshot_is_refused_before_touching_store() {
        let (dir, store, backups) = setup();
        store.write("a.json", &json!({"n": 1})).unwrap();
        backups.create(&store).unwrap();

        fs::write(dir.path().join(".docsync/backups/v000001/a.json"), "{\"n\": 666}").unwrap();
        store.write("a.json", &json!({"n": 2})).unwrap();

        assert!(matches!(
            backups.restore(&store, 1),
            Err(Error::BackupCorrupted { version: 1, .. })
        ));
        assert_eq!(store.read("a.json").unwrap().value, json!({"n": 2}));
    }

    #[test]
    fn version_dir_names() {
        assert_eq!(parse_version_dir("v000012"), Some(12));
        assert_eq!(parse_version_dir("v"), None);
        assert_eq!(parse_version_dir(".staging-x"), None);
        assert_eq!(parse_version_dir("HIGH_WATER"), None);
    }
}
