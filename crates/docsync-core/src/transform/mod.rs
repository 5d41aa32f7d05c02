//! Transform pipeline: filter, map and sort over list documents
//!
//! A request names a source list document, a destination and an
//! operation. The source is read, transformed in memory and the result is
//! written to the destination; the source file is never modified.
//!
//! Parameters per operation:
//!
//! | operation | parameters |
//! |-----------|------------|
//! | `filter`  | `{"key": str, "value": any}` |
//! | `map`     | `{"field_map": {from: to}}` |
//! | `sort`    | `{"key": str, "reverse": bool}` or `{"key": str, "order": "asc" \| "desc"}` |

mod ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::shape_of;
use crate::store::{DocumentMeta, DocumentStore};
use crate::{Error, Result};

/// A transform as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub input_filename: String,
    pub output_filename: String,
    pub operation: String,
    #[serde(default)]
    pub parameters: Value,
}

/// A parsed, ready-to-run operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Keep elements whose `key` equals `value` exactly
    Filter { key: String, value: Value },
    /// Rename keys; all renames of one element happen at once
    Map { field_map: Vec<(String, String)> },
    /// Stable sort by `key`
    Sort { key: String, descending: bool },
}

impl Operation {
    /// Parse an operation kind and its parameters.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOperation`] for an unrecognised kind,
    /// [`Error::InvalidParameters`] when required parameters are missing or
    /// mistyped.
    pub fn parse(kind: &str, params: &Value) -> Result<Self> {
        match kind {
            "filter" => {
                let key = string_param(kind, params, "key")?;
                let value = params.get("value").cloned().ok_or_else(|| invalid(kind, "missing 'value'"))?;
                Ok(Self::Filter { key, value })
            }
            "map" => {
                let map = params
                    .get("field_map")
                    .and_then(Value::as_object)
                    .ok_or_else(|| invalid(kind, "'field_map' must be an object"))?;
                let field_map = map
                    .iter()
                    .map(|(from, to)| match to {
                        Value::String(to) => Ok((from.clone(), to.clone())),
                        other => Err(invalid(
                            kind,
                            format!("target for '{}' must be a string, found {}", from, other),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Map { field_map })
            }
            "sort" => {
                let key = string_param(kind, params, "key")?;
                let descending = match (params.get("reverse"), params.get("order")) {
                    (Some(Value::Bool(reverse)), None) => *reverse,
                    (None, Some(Value::String(order))) => match order.as_str() {
                        "asc" => false,
                        "desc" => true,
                        other => {
                            return Err(invalid(kind, format!("unknown order '{}'", other)));
                        }
                    },
                    (None, None) => false,
                    (Some(_), Some(_)) => {
                        return Err(invalid(kind, "use either 'reverse' or 'order', not both"));
                    }
                    _ => return Err(invalid(kind, "'reverse' must be a boolean and 'order' a string")),
                };
                Ok(Self::Sort { key, descending })
            }
            other => Err(Error::UnknownOperation {
                operation: other.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Filter { .. } => "filter",
            Self::Map { .. } => "map",
            Self::Sort { .. } => "sort",
        }
    }

    /// Apply the operation to a list of elements.
    pub fn apply(&self, items: Vec<Value>) -> Vec<Value> {
        match self {
            Self::Filter { key, value } => items
                .into_iter()
                .filter(|item| item.as_object().is_some_and(|m| m.get(key) == Some(value)))
                .collect(),
            Self::Map { field_map } => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(rename(map, field_map)),
                    other => other,
                })
                .collect(),
            Self::Sort { key, descending } => {
                let mut items = items;
                // slice::sort_by is stable
                if *descending {
                    items.sort_by(|a, b| ordering::compare(b.get(key), a.get(key)));
                } else {
                    items.sort_by(|a, b| ordering::compare(a.get(key), b.get(key)));
                }
                items
            }
        }
    }
}

fn rename(map: Map<String, Value>, field_map: &[(String, String)]) -> Map<String, Value> {
    let target_of = |key: &str| {
        field_map
            .iter()
            .find(|(from, _)| from == key)
            .map(|(_, to)| to.clone())
    };

    let mut out = Map::with_capacity(map.len());
    let mut renamed = Vec::new();
    for (key, value) in map {
        match target_of(&key) {
            Some(to) => renamed.push((to, value)),
            None => {
                out.insert(key, value);
            }
        }
    }
    // Renamed values win over pass-through keys of the same name
    for (to, value) in renamed {
        out.insert(to, value);
    }
    out
}

fn string_param(kind: &str, params: &Value, name: &str) -> Result<String> {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(kind, format!("'{}' must be a string", name)))
}

fn invalid(kind: &str, message: impl Into<String>) -> Error {
    Error::InvalidParameters {
        operation: kind.to_string(),
        message: message.into(),
    }
}

/// Result of a completed transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformReport {
    pub operation: String,
    pub input_count: usize,
    pub output_count: usize,
    pub output: DocumentMeta,
}

/// Runs transform requests against a document store.
pub struct TransformEngine<'a> {
    store: &'a DocumentStore,
}

impl<'a> TransformEngine<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    pub fn apply(&self, request: &TransformRequest) -> Result<TransformReport> {
        let operation = Operation::parse(&request.operation, &request.parameters)?;
        if request.input_filename == request.output_filename {
            return Err(invalid(
                operation.name(),
                "output must differ from input; the source is never modified",
            ));
        }

        let source = self.store.read(&request.input_filename)?;
        let items = match source.value {
            Value::Array(items) => items,
            other => {
                return Err(Error::UnsupportedShape {
                    document: request.input_filename.clone(),
                    expected: "a list".into(),
                    found: shape_of(&other),
                });
            }
        };

        let input_count = items.len();
        let result = operation.apply(items);
        let output_count = result.len();
        let output = self
            .store
            .write(&request.output_filename, &Value::Array(result))?;

        tracing::info!(
            operation = operation.name(),
            input = %request.input_filename,
            output = %request.output_filename,
            input_count,
            output_count,
            "Applied transform"
        );

        Ok(TransformReport {
            operation: operation.name().to_string(),
            input_count,
            output_count,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(kind: &str, params: Value, items: Value) -> Value {
        let op = Operation::parse(kind, &params).unwrap();
        let Value::Array(items) = items else {
            panic!("test input must be a list")
        };
        Value::Array(op.apply(items))
    }

    #[test]
    fn filter_keeps_exact_matches() {
        let out = run(
            "filter",
            json!({"key": "status", "value": "active"}),
            json!([{"status": "active"}, {"status": "inactive"}]),
        );
        assert_eq!(out, json!([{"status": "active"}]));
    }

    #[test]
    fn filter_is_type_sensitive_and_drops_non_objects() {
        let out = run(
            "filter",
            json!({"key": "id", "value": 1}),
            json!([{"id": "1"}, {"id": 1}, 1, {"other": 1}]),
        );
        assert_eq!(out, json!([{"id": 1}]));
    }

    #[test]
    fn map_renames_simultaneously() {
        let out = run(
            "map",
            json!({"field_map": {"a": "b", "b": "a"}}),
            json!([{"a": 1, "b": 2, "c": 3}]),
        );
        assert_eq!(out, json!([{"c": 3, "b": 1, "a": 2}]));
    }

    #[test]
    fn map_overwrites_existing_target() {
        let out = run(
            "map",
            json!({"field_map": {"first": "name"}}),
            json!([{"name": "old", "first": "new"}, "scalar"]),
        );
        assert_eq!(out, json!([{"name": "new"}, "scalar"]));
    }

    #[test]
    fn sort_ascending_and_stable() {
        let out = run(
            "sort",
            json!({"key": "v"}),
            json!([{"v": 3}, {"v": 1, "tag": "first"}, {"v": 2}, {"v": 1, "tag": "second"}]),
        );
        assert_eq!(
            out,
            json!([{"v": 1, "tag": "first"}, {"v": 1, "tag": "second"}, {"v": 2}, {"v": 3}])
        );
    }

    #[test]
    fn sort_missing_keys_first_ascending_last_descending() {
        let items = json!([{"v": 2}, {"x": 0}, {"v": null}, {"v": 1}]);
        assert_eq!(
            run("sort", json!({"key": "v"}), items.clone()),
            json!([{"x": 0}, {"v": null}, {"v": 1}, {"v": 2}])
        );
        assert_eq!(
            run("sort", json!({"key": "v", "order": "desc"}), items.clone()),
            json!([{"v": 2}, {"v": 1}, {"v": null}, {"x": 0}])
        );
        assert_eq!(
            run("sort", json!({"key": "v", "reverse": true}), items),
            json!([{"v": 2}, {"v": 1}, {"v": null}, {"x": 0}])
        );
    }

    #[test]
    fn descending_sort_keeps_equal_keys_in_order() {
        let out = run(
            "sort",
            json!({"key": "v", "reverse": true}),
            json!([{"v": 1, "n": 1}, {"v": 2}, {"v": 1, "n": 2}]),
        );
        assert_eq!(out, json!([{"v": 2}, {"v": 1, "n": 1}, {"v": 1, "n": 2}]));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            Operation::parse("explode", &json!({})),
            Err(Error::UnknownOperation { .. })
        ));
        assert!(matches!(
            Operation::parse("filter", &json!({"key": "a"})),
            Err(Error::InvalidParameters { .. })
        ));
        assert!(matches!(
            Operation::parse("sort", &json!({"key": "a", "order": "sideways"})),
            Err(Error::InvalidParameters { .. })
        ));
        assert!(matches!(
            Operation::parse("map", &json!({"field_map": {"a": 1}})),
            Err(Error::InvalidParameters { .. })
        ));
    }
}
