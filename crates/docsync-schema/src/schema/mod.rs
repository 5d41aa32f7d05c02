//! Schema model - parsed from `schemas/*.json`
//!
//! A schema is a named structural contract with a fixed JSON shape:
//!
//! ```json
//! {
//!   "type": "object",
//!   "required": ["name", "email"],
//!   "properties": {
//!     "name": { "type": "string" },
//!     "email": { "type": "string", "format": "email" },
//!     "age": { "type": "integer" },
//!     "address": {
//!       "type": "object",
//!       "required": ["city"],
//!       "properties": { "city": { "type": "string" } }
//!     },
//!     "tags": { "type": "array", "items": { "type": "string" } }
//!   }
//! }
//! ```
//!
//! Parsing checks well-formedness up front, so a [`Schema`] value is always
//! usable for validation.

mod format;

pub use format::Format;

use serde_json::{Map, Value};

use crate::{Error, Result};

/// The JSON type a field is declared to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Object,
    Array,
    String,
    /// Any numeric value, integer or floating
    Number,
    /// Numeric values without a fractional representation
    Integer,
    Boolean,
    Null,
}

impl FieldType {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }

    /// Whether `value` structurally matches this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraints for a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Accepted types; empty means any type
    pub types: Vec<FieldType>,
    /// Format applied to string values once the type check passed
    pub format: Option<Format>,
    /// Nested object contract
    pub object: Option<ObjectSpec>,
    /// Contract for every array element
    pub items: Option<Box<FieldSpec>>,
}

/// Required fields and properties of an object, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSpec {
    pub required: Vec<String>,
    pub properties: Vec<(String, FieldSpec)>,
}

impl ObjectSpec {
    pub fn property(&self, name: &str) -> Option<&FieldSpec> {
        self.properties
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, spec)| spec)
    }
}

/// A named, well-formed schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    root: ObjectSpec,
    source: Value,
}

impl Schema {
    /// Parse and check a schema definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaDefinition`] when the root is not an object
    /// schema, a `required` entry has no matching property, or a type or
    /// format name is unknown.
    pub fn from_value(name: &str, source: Value) -> Result<Self> {
        let map = source
            .as_object()
            .ok_or_else(|| Error::definition(name, "schema root must be a JSON object"))?;

        match map.get("type") {
            None => {}
            Some(Value::String(t)) if t == "object" => {}
            Some(other) => {
                return Err(Error::definition(
                    name,
                    format!("root type must be \"object\", found {}", other),
                ));
            }
        }

        let root = parse_object(name, "", map)?;
        Ok(Self {
            name: name.to_string(),
            root,
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &ObjectSpec {
        &self.root
    }

    /// The definition this schema was parsed from.
    pub fn source(&self) -> &Value {
        &self.source
    }
}

fn parse_object(schema: &str, at: &str, map: &Map<String, Value>) -> Result<ObjectSpec> {
    let mut spec = ObjectSpec::default();

    if let Some(props) = map.get("properties") {
        let props = props.as_object().ok_or_else(|| {
            Error::definition(schema, format!("'properties'{} must be an object", located(at)))
        })?;
        for (prop, def) in props {
            let path = join(at, prop);
            spec.properties.push((prop.clone(), parse_field(schema, &path, def)?));
        }
    }

    if let Some(required) = map.get("required") {
        let required = required.as_array().ok_or_else(|| {
            Error::definition(schema, format!("'required'{} must be an array", located(at)))
        })?;
        for entry in required {
            let field = entry.as_str().ok_or_else(|| {
                Error::definition(
                    schema,
                    format!("'required'{} entries must be strings, found {}", located(at), entry),
                )
            })?;
            if spec.property(field).is_none() {
                return Err(Error::definition(
                    schema,
                    format!(
                        "required field '{}' is not declared in properties",
                        join(at, field)
                    ),
                ));
            }
            spec.required.push(field.to_string());
        }
    }

    Ok(spec)
}

fn parse_field(schema: &str, path: &str, def: &Value) -> Result<FieldSpec> {
    let map = def.as_object().ok_or_else(|| {
        Error::definition(schema, format!("definition of '{}' must be an object", path))
    })?;

    let types = match map.get("type") {
        None => Vec::new(),
        Some(Value::String(t)) => vec![parse_type(schema, path, t)?],
        Some(Value::Array(list)) => list
            .iter()
            .map(|t| match t.as_str() {
                Some(t) => parse_type(schema, path, t),
                None => Err(Error::definition(
                    schema,
                    format!("type of '{}' must be a string, found {}", path, t),
                )),
            })
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(Error::definition(
                schema,
                format!("type of '{}' must be a string or list, found {}", path, other),
            ));
        }
    };

    let format = match map.get("format") {
        None => None,
        Some(Value::String(f)) => Some(Format::parse(f).ok_or_else(|| {
            Error::definition(schema, format!("unknown format '{}' for '{}'", f, path))
        })?),
        Some(other) => {
            return Err(Error::definition(
                schema,
                format!("format of '{}' must be a string, found {}", path, other),
            ));
        }
    };

    let object = if map.contains_key("properties") || map.contains_key("required") {
        Some(parse_object(schema, path, map)?)
    } else {
        None
    };

    let items = match map.get("items") {
        Some(items) => Some(Box::new(parse_field(schema, &format!("{}[]", path), items)?)),
        None => None,
    };

    Ok(FieldSpec {
        types,
        format,
        object,
        items,
    })
}

fn parse_type(schema: &str, path: &str, name: &str) -> Result<FieldType> {
    FieldType::parse(name)
        .ok_or_else(|| Error::definition(schema, format!("unknown type '{}' for '{}'", name, path)))
}

fn join(at: &str, field: &str) -> String {
    if at.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", at, field)
    }
}

fn located(at: &str) -> String {
    if at.is_empty() {
        String::new()
    } else {
        format!(" of '{}'", at)
    }
}
