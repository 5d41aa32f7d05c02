//! Schema registry and validation for docsync.
//!
//! This crate owns the structural contracts documents are checked against:
//!
//! - **Schema model**: parsed, well-formedness-checked schema definitions
//! - **Registry**: named schemas, optionally backed by a `schemas/` directory
//! - **Validator**: deterministic, fail-fast validation with dotted field paths
//! - **Inference**: derive a starting schema from a sample document

pub mod error;
pub mod infer;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod validation;

pub use error::{Error, Result};
pub use infer::infer_schema;
pub use loader::SchemaLoader;
pub use registry::{SchemaNames, SchemaRegistry};
pub use schema::{FieldSpec, FieldType, Format, ObjectSpec, Schema};
pub use validation::{ValidationError, ValidationResult, Validator, Violation, validate};
