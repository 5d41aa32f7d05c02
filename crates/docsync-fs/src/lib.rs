//! Filesystem primitives for docsync
//!
//! Provides normalized path handling, name validation, atomic locked I/O,
//! content-addressed checksums, glob matching and format-agnostic config
//! loading. Everything above this crate goes through these helpers when it
//! touches the disk.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod glob;
pub mod io;
pub mod path;

pub use checksum::{
    canonical_json, compute_bytes_checksum, compute_content_checksum, compute_value_checksum,
};
pub use config::{ConfigFormat, ConfigStore};
pub use constants::StatePath;
pub use error::{Error, Result};
pub use glob::GlobPattern;
pub use io::RobustnessConfig;
pub use path::{NormalizedPath, validate_document_name, validate_path_identifier};
