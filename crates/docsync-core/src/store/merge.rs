use docsync_fs::GlobPattern;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DocumentMeta, DocumentStore};
use crate::Result;

/// What a merge combined and where it went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub destination: DocumentMeta,
    /// Matched source documents, in the order they were combined
    pub sources: Vec<String>,
}

impl DocumentStore {
    /// Combine every document whose name matches `pattern` into `destination`.
    ///
    /// Sources are taken in ascending name order and never include the
    /// destination itself. Lists are concatenated, objects are merged with
    /// later documents winning on key collisions, and a mix of both yields
    /// a list. No match writes an empty list.
    pub fn merge(&self, pattern: &str, destination: &str) -> Result<MergeReport> {
        let glob = GlobPattern::new(pattern)?;
        let sources: Vec<String> = self
            .list()?
            .into_iter()
            .filter(|name| name != destination && glob.matches(name))
            .collect();

        let values = sources
            .iter()
            .map(|name| self.read(name).map(|doc| doc.value))
            .collect::<Result<Vec<_>>>()?;

        let merged = combine(values);
        let meta = self.write(destination, &merged)?;
        tracing::info!(
            pattern,
            destination,
            sources = sources.len(),
            "Merged documents"
        );

        Ok(MergeReport {
            destination: meta,
            sources,
        })
    }
}

fn combine(values: Vec<Value>) -> Value {
    if !values.is_empty() && values.iter().all(Value::is_object) {
        let mut merged = Map::new();
        for value in values {
            if let Value::Object(map) = value {
                merged.extend(map);
            }
        }
        return Value::Object(merged);
    }

    let mut items = Vec::new();
    for value in values {
        match value {
            Value::Array(list) => items.extend(list),
            other => items.push(other),
        }
    }
    Value::Array(items)
}
