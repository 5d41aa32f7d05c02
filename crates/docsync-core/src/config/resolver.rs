//! Configuration resolution with hierarchical merge

use docsync_fs::{ConfigStore, NormalizedPath};
use serde_json::Value;

use super::EngineConfig;
use crate::{Error, Result};

const BASE_FILES: [&str; 4] = ["docsync.toml", "docsync.json", "docsync.yaml", "docsync.yml"];
const LOCAL_FILE: &str = "docsync.local.toml";

/// Resolves configuration for a data directory.
pub struct ConfigResolver {
    root: NormalizedPath,
    store: ConfigStore,
}

impl ConfigResolver {
    pub fn new(root: NormalizedPath) -> Self {
        Self {
            root,
            store: ConfigStore::new(),
        }
    }

    /// Resolve using the process environment.
    pub fn resolve(&self) -> Result<EngineConfig> {
        self.resolve_with_env(|key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Result<EngineConfig> {
        let mut merged = serde_json::to_value(EngineConfig::default())?;

        if let Some(base) = BASE_FILES
            .iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
        {
            tracing::debug!(path = %base, "Loading configuration");
            let layer: Value = self.store.load(&base)?;
            deep_merge(&mut merged, layer);
        }

        let local = self.root.join(LOCAL_FILE);
        if let Some(layer) = self.store.load_optional::<Value>(&local)? {
            tracing::debug!(path = %local, "Applying local configuration overrides");
            deep_merge(&mut merged, layer);
        }

        let mut config: EngineConfig = serde_json::from_value(merged).map_err(|e| Error::Config {
            message: format!("invalid configuration: {}", e),
        })?;

        if let Some(url) = env("DATABASE_URL").filter(|u| !u.is_empty()) {
            config.database.url = Some(url);
        }
        if let Some(workers) = env("DOCSYNC_WORKERS") {
            config.sync.workers = workers.trim().parse().map_err(|_| Error::Config {
                message: format!("DOCSYNC_WORKERS must be a positive integer, got '{}'", workers),
            })?;
        }

        Ok(config)
    }
}

/// Merge `overlay` into `base`: objects key by key, anything else replaced.
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
