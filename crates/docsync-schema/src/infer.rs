//! Derive a starting schema from a sample document

use serde_json::{Map, Value, json};

use crate::validation::json_type_name;

/// Infer a schema definition from `sample`.
///
/// Objects recurse into their properties and arrays describe their items by
/// the first element. A list sample yields the schema of its first element,
/// matching how list documents are validated element-wise; an empty list
/// yields an open object schema. With `require_present`, every key present
/// in an object is listed as required.
///
/// The result for an object or list sample is always accepted by
/// [`crate::Schema::from_value`].
pub fn infer_schema(sample: &Value, require_present: bool) -> Value {
    match sample {
        Value::Object(map) => infer_object(map, require_present),
        Value::Array(items) => match items.first() {
            Some(first @ Value::Object(_)) => infer_schema(first, require_present),
            _ => json!({"type": "object", "properties": {}}),
        },
        other => json!({"type": json_type_name(other)}),
    }
}

fn infer_object(map: &Map<String, Value>, require_present: bool) -> Value {
    let properties: Map<String, Value> = map
        .iter()
        .map(|(key, value)| (key.clone(), infer_field(value, require_present)))
        .collect();

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    if require_present {
        let required: Vec<Value> = map.keys().map(|k| Value::String(k.clone())).collect();
        schema.insert("required".into(), Value::Array(required));
    }
    schema.insert("properties".into(), Value::Object(properties));
    Value::Object(schema)
}

fn infer_field(value: &Value, require_present: bool) -> Value {
    match value {
        Value::Object(map) => infer_object(map, require_present),
        Value::Array(items) => match items.first() {
            Some(first) => json!({"type": "array", "items": infer_field(first, require_present)}),
            None => json!({"type": "array"}),
        },
        other => json!({"type": json_type_name(other)}),
    }
}
