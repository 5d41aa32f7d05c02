//! Constants and enums for data directory paths.

use std::path::Path;

/// Well-known locations inside a docsync data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePath {
    /// The `.docsync` directory (engine-owned state)
    StateDir,
    /// The `backups` directory under the state directory
    Backups,
    /// The `locks` directory under the state directory
    Locks,
    /// The local sync history ledger
    History,
    /// The default SQLite database for synchronized records
    Records,
    /// The `schemas` directory (user-owned schema documents)
    Schemas,
}

impl StatePath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateDir => ".docsync",
            Self::Backups => "backups",
            Self::Locks => "locks",
            Self::History => "history.jsonl",
            Self::Records => "records.db",
            Self::Schemas => "schemas",
        }
    }
}

impl AsRef<Path> for StatePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for StatePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for StatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
