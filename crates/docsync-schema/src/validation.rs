//! Document validation against a schema
//!
//! Validation is fail-fast and deterministic: required fields are checked
//! first in declaration order, then each declared property in declaration
//! order (type, then format, then nested contracts). The first violation
//! stops validation and is reported with its dotted field path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{FieldSpec, ObjectSpec, Schema};
use crate::{Result, SchemaRegistry};

/// What went wrong at a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A required field is absent
    MissingField,
    /// The value's JSON type is not one of the declared types
    TypeMismatch { expected: String, found: String },
    /// A string value does not have the declared format
    InvalidFormat { format: String },
}

/// The first failing field of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted path to the field (`address.city`, `2.email`); empty for the root
    pub path: String,
    pub violation: Violation,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() {
            "(root)"
        } else {
            &self.path
        };
        match &self.violation {
            Violation::MissingField => write!(f, "{}: required field is missing", path),
            Violation::TypeMismatch { expected, found } => {
                write!(f, "{}: expected {}, found {}", path, expected, found)
            }
            Violation::InvalidFormat { format } => {
                write!(f, "{}: value is not a valid {}", path, format)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Outcome of one validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<ValidationError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn failed(error: ValidationError) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }
}

/// Validates documents against schemas looked up by name.
///
/// Each call takes a snapshot of the named schema when it starts, so a
/// concurrent re-registration only affects later calls.
pub struct Validator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Validate `document` against the schema registered as `schema_name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SchemaNotFound`] if no such schema exists.
    pub fn validate(&self, document: &Value, schema_name: &str) -> Result<ValidationResult> {
        let schema = self.registry.get(schema_name)?;
        Ok(validate(document, &schema))
    }
}

/// Validate a document against a schema.
///
/// Object documents are checked directly; list documents element-wise, with
/// the element index as the first path segment.
pub fn validate(document: &Value, schema: &Schema) -> ValidationResult {
    let outcome = match document {
        Value::Object(map) => check_object(schema.root(), map, ""),
        Value::Array(items) => items.iter().enumerate().try_for_each(|(i, item)| {
            let path = i.to_string();
            match item {
                Value::Object(map) => check_object(schema.root(), map, &path),
                other => Err(mismatch(&path, "object", other)),
            }
        }),
        other => Err(mismatch("", "object or array", other)),
    };

    match outcome {
        Ok(()) => ValidationResult::ok(),
        Err(error) => ValidationResult::failed(error),
    }
}

type Check = std::result::Result<(), ValidationError>;

fn check_object(spec: &ObjectSpec, map: &Map<String, Value>, at: &str) -> Check {
    for field in &spec.required {
        if !map.contains_key(field) {
            return Err(ValidationError {
                path: join(at, field),
                violation: Violation::MissingField,
            });
        }
    }

    for (name, field) in &spec.properties {
        if let Some(value) = map.get(name) {
            check_field(field, value, &join(at, name))?;
        }
    }

    Ok(())
}

fn check_field(spec: &FieldSpec, value: &Value, path: &str) -> Check {
    if !spec.types.is_empty() && !spec.types.iter().any(|t| t.matches(value)) {
        let expected = spec
            .types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        return Err(mismatch(path, &expected, value));
    }

    if let (Some(format), Value::String(s)) = (spec.format, value)
        && !format.check(s)
    {
        return Err(ValidationError {
            path: path.to_string(),
            violation: Violation::InvalidFormat {
                format: format.as_str().to_string(),
            },
        });
    }

    match value {
        Value::Object(map) => {
            if let Some(object) = &spec.object {
                check_object(object, map, path)?;
            }
        }
        Value::Array(items) => {
            if let Some(item_spec) = &spec.items {
                for (i, item) in items.iter().enumerate() {
                    check_field(item_spec, item, &join(path, &i.to_string()))?;
                }
            }
        }
        _ => {}
    }

    Ok(())
}

fn mismatch(path: &str, expected: &str, found: &Value) -> ValidationError {
    ValidationError {
        path: path.to_string(),
        violation: Violation::TypeMismatch {
            expected: expected.to_string(),
            found: json_type_name(found).to_string(),
        },
    }
}

/// The JSON type name of a value, distinguishing integers from other numbers.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(at: &str, field: &str) -> String {
    if at.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", at, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user_schema() -> Schema {
        Schema::from_value(
            "user",
            json!({
                "type": "object",
                "required": ["name", "email"],
                "properties": {
                    "name": {"type": "string"},
                    "email": {"type": "string", "format": "email"},
                    "age": {"type": "integer"},
                    "score": {"type": "number"},
                    "address": {
                        "type": "object",
                        "required": ["city"],
                        "properties": {"city": {"type": "string"}}
                    },
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            }),
        )
        .unwrap()
    }

    #[test]
    fn valid_document_passes() {
        let doc = json!({"name": "Ada", "email": "ada@example.com", "age": 36, "score": 9.5});
        assert_eq!(validate(&doc, &user_schema()), ValidationResult::ok());
    }

    #[test]
    fn first_missing_required_field_in_declaration_order() {
        let result = validate(&json!({"age": 3}), &user_schema());
        assert_eq!(
            result.error,
            Some(ValidationError {
                path: "name".into(),
                violation: Violation::MissingField
            })
        );
    }

    #[test]
    fn required_checked_before_types() {
        // name has the wrong type but email is missing; required wins
        let result = validate(&json!({"name": 1}), &user_schema());
        assert_eq!(result.error.unwrap().path, "email");
    }

    #[test]
    fn nested_path_is_dotted() {
        let doc = json!({"name": "Ada", "email": "ada@example.com", "address": {"city": 7}});
        let error = validate(&doc, &user_schema()).error.unwrap();
        assert_eq!(error.path, "address.city");
        assert_eq!(
            error.violation,
            Violation::TypeMismatch {
                expected: "string".into(),
                found: "integer".into()
            }
        );
    }

    #[test]
    fn format_checked_after_type() {
        let doc = json!({"name": "Ada", "email": 5});
        let error = validate(&doc, &user_schema()).error.unwrap();
        assert!(matches!(error.violation, Violation::TypeMismatch { .. }));

        let doc = json!({"name": "Ada", "email": "not-an-email"});
        let error = validate(&doc, &user_schema()).error.unwrap();
        assert_eq!(
            error.violation,
            Violation::InvalidFormat {
                format: "email".into()
            }
        );
    }

    #[test]
    fn integer_field_rejects_float() {
        let doc = json!({"name": "Ada", "email": "ada@example.com", "age": 36.5});
        let error = validate(&doc, &user_schema()).error.unwrap();
        assert_eq!(error.path, "age");
    }

    #[test]
    fn list_documents_prefix_element_index() {
        let doc = json!([
            {"name": "Ada", "email": "ada@example.com"},
            {"name": "Bob", "email": "bob@example.com", "tags": ["x", 2]}
        ]);
        let error = validate(&doc, &user_schema()).error.unwrap();
        assert_eq!(error.path, "1.tags.1");
    }

    #[test]
    fn scalar_document_is_a_root_mismatch() {
        let error = validate(&json!("text"), &user_schema()).error.unwrap();
        assert_eq!(error.path, "");
        assert_eq!(error.to_string(), "(root): expected object or array, found string");
    }

    #[test]
    fn undeclared_fields_are_allowed() {
        let doc = json!({"name": "Ada", "email": "ada@example.com", "extra": [1, 2]});
        assert!(validate(&doc, &user_schema()).valid);
    }
}
