//! [`TestDataDir`] builder for docsync data directories.

use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::schemas::{sample_users, users_schema};

/// Write `value` as pretty JSON to `dir/name`, creating parent directories.
///
/// # Panics
/// Panics if the file cannot be written.
pub fn write_doc(dir: &Path, name: &str, value: &Value) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let text = serde_json::to_string_pretty(value).unwrap();
    fs::write(&path, text + "\n")
        .unwrap_or_else(|e| panic!("Could not write {}: {}", path.display(), e));
}

/// A temporary docsync data directory with helpers for setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use docsync_test_utils::TestDataDir;
/// use serde_json::json;
///
/// let dir = TestDataDir::new();
/// dir.doc("users.json", &json!([]));
/// dir.assert_file_exists("users.json");
/// ```
pub struct TestDataDir {
    temp_dir: TempDir,
}

impl Default for TestDataDir {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDataDir {
    /// Create an empty temporary data directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the data directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a document at the top level.
    pub fn doc(&self, name: &str, value: &Value) -> &Self {
        write_doc(self.root(), name, value);
        self
    }

    /// Write a raw, possibly malformed, file.
    pub fn raw(&self, name: &str, content: &str) -> &Self {
        fs::write(self.root().join(name), content).unwrap();
        self
    }

    /// Write `schemas/<name>.json`.
    pub fn schema(&self, name: &str, definition: &Value) -> &Self {
        write_doc(self.root(), &format!("schemas/{}.json", name), definition);
        self
    }

    /// Write `docsync.toml`.
    pub fn config(&self, toml: &str) -> &Self {
        fs::write(self.root().join("docsync.toml"), toml).unwrap();
        self
    }

    /// Read a top-level document back as JSON.
    ///
    /// # Panics
    /// Panics if the file is missing or not valid JSON.
    pub fn read(&self, name: &str) -> Value {
        let path = self.root().join(name);
        let text = fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()));
        serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("{} is not valid JSON: {}", path.display(), e))
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }
}

/// A data directory holding a `users` schema, a valid `users.json`, an
/// unbound `orders.json` and a `settings.json` object document.
pub fn seeded_store() -> TestDataDir {
    let dir = TestDataDir::new();
    dir.schema("users", &users_schema())
        .doc("users.json", &sample_users())
        .doc(
            "orders.json",
            &json!([
                {"id": 10, "user": 1, "total": 25.5},
                {"id": 11, "user": 2, "total": 8}
            ]),
        )
        .doc("settings.json", &json!({"theme": "dark", "page_size": 20}));
    dir
}
