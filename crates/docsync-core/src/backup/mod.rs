//! Versioned backups of the whole document store
//!
//! Backups are stored at `.docsync/backups/` with:
//! - `v000001/`, `v000002/`, ...: one immutable snapshot per version, holding
//!   the document files and a `manifest.json`
//! - `HIGH_WATER`: the highest version ever assigned, so a version number is
//!   never handed out twice even if a snapshot directory disappears

mod snapshot;

pub use snapshot::{BackupEntry, BackupManager, BackupManifest, RestoreReport};
