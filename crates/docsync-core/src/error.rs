//! Error types for docsync-core

use docsync_schema::ValidationError;

/// Result type for docsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in docsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Schema definition and lookup errors from docsync-schema
    #[error(transparent)]
    Schema(#[from] docsync_schema::Error),

    /// A document does not satisfy its declared schema
    #[error("Document '{document}' does not match schema '{schema}': {error}")]
    Validation {
        document: String,
        schema: String,
        error: ValidationError,
    },

    #[error("Document not found: {name}")]
    DocumentNotFound { name: String },

    #[error("Invalid document name: {message}")]
    InvalidDocumentName { message: String },

    /// The document exists but is not valid JSON
    #[error("Document '{document}' is not valid JSON: {message}")]
    InvalidJson { document: String, message: String },

    #[error("Document '{document}' must be {expected}, found {found}")]
    UnsupportedShape {
        document: String,
        expected: String,
        found: String,
    },

    #[error("Unknown operation: {operation}")]
    UnknownOperation { operation: String },

    #[error("Invalid parameters for {operation}: {message}")]
    InvalidParameters { operation: String, message: String },

    #[error("Backup version {version} not found")]
    BackupNotFound { version: u64 },

    /// A snapshot no longer matches its manifest
    #[error("Backup version {version} is corrupted: {message}")]
    BackupCorrupted { version: u64, message: String },

    /// The external store could not be reached; aborts the whole run
    #[error("Cannot connect to record store for table '{table}': {message}")]
    SyncConnection { table: String, message: String },

    /// A single record failed; captured per record and never aborts a run
    #[error("Failed to sync '{document}': {message}")]
    SyncRecord { document: String, message: String },

    #[error("Invalid table name '{name}': must match [A-Za-z_][A-Za-z0-9_]* and not be reserved")]
    InvalidTableName { name: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Fs(#[from] docsync_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema(docsync_schema::Error::SchemaDefinition { .. }) => "schema_definition",
            Self::Schema(docsync_schema::Error::SchemaNotFound { .. }) => "schema_not_found",
            Self::Schema(docsync_schema::Error::Fs(_)) | Self::Fs(_) | Self::Io(_) => "io",
            Self::Validation { .. } => "validation",
            Self::DocumentNotFound { .. } => "document_not_found",
            Self::InvalidDocumentName { .. } => "invalid_document_name",
            Self::InvalidJson { .. } | Self::Json(_) => "invalid_json",
            Self::UnsupportedShape { .. } => "unsupported_shape",
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::InvalidParameters { .. } => "invalid_parameters",
            Self::BackupNotFound { .. } => "backup_not_found",
            Self::BackupCorrupted { .. } => "backup_corrupted",
            Self::SyncConnection { .. } => "sync_connection",
            Self::SyncRecord { .. } => "sync_record",
            Self::InvalidTableName { .. } => "invalid_table_name",
            Self::Database { .. } => "database",
            Self::Config { .. } => "config",
        }
    }

    pub(crate) fn database(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Database {
            message: format!("{}: {}", context, err),
        }
    }
}

/// JSON type name used in shape errors.
pub(crate) fn shape_of(value: &serde_json::Value) -> String {
    docsync_schema::validation::json_type_name(value).to_string()
}
