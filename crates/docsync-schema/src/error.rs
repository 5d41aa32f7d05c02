//! Error types for docsync-schema

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] docsync_fs::Error),

    /// The schema document is not a well-formed contract
    #[error("Invalid schema '{schema}': {message}")]
    SchemaDefinition { schema: String, message: String },

    /// No schema registered under this name
    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },
}

impl Error {
    pub(crate) fn definition(schema: &str, message: impl Into<String>) -> Self {
        Self::SchemaDefinition {
            schema: schema.to_string(),
            message: message.into(),
        }
    }
}
