//! Schema binding and store-wide validation

use docsync_fs::GlobPattern;
use docsync_schema::{SchemaRegistry, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SchemaBinding;
use crate::store::DocumentStore;
use crate::sync::{CancellationFlag, WorkerPool};
use crate::{Error, Result};

/// Decides which schema governs a document.
///
/// The first binding whose pattern matches the document name wins;
/// otherwise a registered schema named after the document stem applies;
/// otherwise the document has no schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaBindings {
    rules: Vec<(GlobPattern, String)>,
}

impl SchemaBindings {
    pub fn new(bindings: &[SchemaBinding]) -> Result<Self> {
        let rules = bindings
            .iter()
            .map(|b| Ok((GlobPattern::new(&b.pattern)?, b.schema.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn resolve(&self, document: &str, registry: &SchemaRegistry) -> Option<String> {
        if let Some((_, schema)) = self.rules.iter().find(|(glob, _)| glob.matches(document)) {
            return Some(schema.clone());
        }
        let stem = document.strip_suffix(".json").unwrap_or(document);
        registry.contains(stem).then(|| stem.to_string())
    }
}

/// Validation outcome for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentValidation {
    pub document: String,
    pub schema: Option<String>,
    pub valid: bool,
    /// Why the document is invalid
    pub description: Option<String>,
    /// The failing field, when the document parsed but broke its schema
    pub violation: Option<ValidationError>,
}

/// Summary of validating every document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub results: Vec<DocumentValidation>,
}

/// Read one document and check it against its declared schema.
///
/// Returns the parsed value alongside the outcome when the document is valid.
pub(crate) fn check_document(
    store: &DocumentStore,
    registry: &SchemaRegistry,
    bindings: &SchemaBindings,
    name: &str,
) -> (DocumentValidation, Option<Value>) {
    let schema = bindings.resolve(name, registry);
    let failed = |err: Error, violation: Option<ValidationError>| DocumentValidation {
        document: name.to_string(),
        schema: schema.clone(),
        valid: false,
        description: Some(err.to_string()),
        violation,
    };

    let doc = match store.read(name) {
        Ok(doc) => doc,
        Err(err) => return (failed(err, None), None),
    };

    if let Some(schema_name) = &schema {
        match Validator::new(registry).validate(&doc.value, schema_name) {
            Ok(result) => {
                if let Some(error) = result.error {
                    let err = Error::Validation {
                        document: name.to_string(),
                        schema: schema_name.clone(),
                        error: error.clone(),
                    };
                    return (failed(err, Some(error)), None);
                }
            }
            Err(err) => return (failed(err.into(), None), None),
        }
    }

    let outcome = DocumentValidation {
        document: name.to_string(),
        schema,
        valid: true,
        description: None,
        violation: None,
    };
    (outcome, Some(doc.value))
}

/// Validate every document on the pool.
pub(crate) fn validate_all(
    store: &DocumentStore,
    registry: &SchemaRegistry,
    bindings: &SchemaBindings,
    pool: WorkerPool,
) -> Result<ValidationSummary> {
    let names = store.list()?;
    let results: Vec<DocumentValidation> = pool
        .run(&names, &CancellationFlag::new(), |name| {
            check_document(store, registry, bindings, name).0
        })
        .into_iter()
        .flatten()
        .collect();

    let valid = results.iter().filter(|r| r.valid).count();
    for invalid in results.iter().filter(|r| !r.valid) {
        tracing::warn!(
            document = %invalid.document,
            "{}",
            invalid.description.as_deref().unwrap_or("invalid")
        );
    }
    tracing::info!(total = results.len(), valid, "Validated documents");

    Ok(ValidationSummary {
        total: results.len(),
        valid,
        invalid: results.len() - valid,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_fs::NormalizedPath;
    use serde_json::json;
    use tempfile::tempdir;

    fn binding(pattern: &str, schema: &str) -> SchemaBinding {
        SchemaBinding {
            pattern: pattern.to_string(),
            schema: schema.to_string(),
        }
    }

    #[test]
    fn first_binding_wins_then_stem() {
        let registry = SchemaRegistry::new();
        registry.register("users", json!({"properties": {}})).unwrap();
        registry.register("people", json!({"properties": {}})).unwrap();

        let bindings = SchemaBindings::new(&[
            binding("users_*.json", "people"),
            binding("users_*", "other"),
        ])
        .unwrap();

        assert_eq!(bindings.resolve("users_eu.json", &registry).as_deref(), Some("people"));
        assert_eq!(bindings.resolve("users.json", &registry).as_deref(), Some("users"));
        assert_eq!(bindings.resolve("orders.json", &registry), None);
    }

    #[test]
    fn unparseable_and_unknown_schema_are_invalid() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(NormalizedPath::new(dir.path()));
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        store.write("orders.json", &json!([])).unwrap();
        store.write("plain.json", &json!({"x": 1})).unwrap();

        let registry = SchemaRegistry::new();
        let bindings = SchemaBindings::new(&[binding("orders.json", "order")]).unwrap();

        let summary = validate_all(&store, &registry, &bindings, WorkerPool::new(2)).unwrap();
        assert_eq!((summary.total, summary.valid, summary.invalid), (3, 1, 2));

        let broken = &summary.results[0];
        assert_eq!(broken.document, "broken.json");
        assert!(broken.description.as_ref().unwrap().contains("not valid JSON"));

        let orders = &summary.results[1];
        assert!(orders.description.as_ref().unwrap().contains("Schema not found"));
    }
}
