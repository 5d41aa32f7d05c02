use std::collections::BTreeMap;
use std::fs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DocumentStore;
use crate::{Error, Result};

/// Size and age of one document file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStat {
    pub name: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Aggregate statistics, computed fresh from the directory on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub total_size_kb: f64,
    pub total_size_mb: f64,
    pub files: Vec<FileStat>,
    /// Document count per name prefix (`users_2024.json` is in `users`)
    pub categories: BTreeMap<String, usize>,
}

/// A search match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub file: String,
    pub data: Value,
}

impl DocumentStore {
    pub fn statistics(&self) -> Result<Statistics> {
        let _gate = self.shared();

        let mut files = Vec::new();
        let mut categories = BTreeMap::new();
        for name in self.list_unlocked()? {
            let path = self.root.join(&name).to_native();
            let metadata = fs::metadata(&path).map_err(|e| docsync_fs::Error::io(&path, e))?;
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .map_err(|e| docsync_fs::Error::io(&path, e))?;

            *categories.entry(category_of(&name).to_string()).or_insert(0) += 1;
            files.push(FileStat {
                name,
                size_bytes: metadata.len(),
                modified,
            });
        }

        let total_size_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();
        Ok(Statistics {
            total_files: files.len(),
            total_size_bytes,
            total_size_kb: round2(total_size_bytes as f64 / 1024.0),
            total_size_mb: round2(total_size_bytes as f64 / (1024.0 * 1024.0)),
            files,
            categories,
        })
    }

    /// Find objects containing `query` (case-insensitive).
    ///
    /// With `field`, only that field's value is searched; otherwise every
    /// top-level value of the candidate. Documents that do not parse are
    /// skipped.
    pub fn search(&self, query: &str, field: Option<&str>) -> Result<Vec<SearchHit>> {
        let needle = query.to_lowercase();
        let mut hits = Vec::new();

        for name in self.list()? {
            let doc = match self.read(&name) {
                Ok(doc) => doc,
                Err(Error::InvalidJson { .. } | Error::DocumentNotFound { .. }) => {
                    tracing::debug!(document = %name, "Skipping unreadable document in search");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let candidates: Vec<&Value> = match &doc.value {
                Value::Array(items) => items.iter().filter(|v| v.is_object()).collect(),
                obj @ Value::Object(_) => vec![obj],
                _ => Vec::new(),
            };

            for candidate in candidates {
                if matches_query(candidate, &needle, field) {
                    hits.push(SearchHit {
                        file: name.clone(),
                        data: candidate.clone(),
                    });
                }
            }
        }

        Ok(hits)
    }
}

fn matches_query(candidate: &Value, needle: &str, field: Option<&str>) -> bool {
    let Some(map) = candidate.as_object() else {
        return false;
    };
    match field {
        Some(field) => map
            .get(field)
            .is_some_and(|v| as_text(v).to_lowercase().contains(needle)),
        None => map.values().any(|v| as_text(v).to_lowercase().contains(needle)),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn category_of(name: &str) -> &str {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    match stem.find('_') {
        Some(idx) if idx > 0 => &stem[..idx],
        _ => "other",
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
