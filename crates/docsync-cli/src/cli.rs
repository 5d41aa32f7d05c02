//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// docsync - validate, transform, back up and synchronize JSON documents
#[derive(Parser, Debug)]
#[command(name = "docsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Data directory holding the documents
    #[arg(short = 'd', long, global = true, env = "DOCSYNC_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Validate every document against its declared schema
    Validate,

    /// Print a document
    Read {
        /// Document name, e.g. users.json
        name: String,
    },

    /// Create or replace a document
    ///
    /// Examples:
    ///   docsync write users.json --file ./users.json
    ///   docsync write flags.json --value '{"beta": true}'
    ///   docsync write users.json --file ./users.json --validate
    Write {
        /// Document name
        name: String,

        /// Read the value from a file
        #[arg(short, long, conflicts_with = "value")]
        file: Option<PathBuf>,

        /// The value as inline JSON
        #[arg(long)]
        value: Option<String>,

        /// Reject the value if it breaks the document's schema
        #[arg(long)]
        validate: bool,
    },

    /// Delete a document
    Delete {
        /// Document name
        name: String,
    },

    /// List documents
    List,

    /// Combine documents matching a glob pattern into one
    Merge {
        /// Glob pattern over document names, e.g. 'users_*.json'
        pattern: String,

        /// Destination document
        destination: String,
    },

    /// Filter, map or sort a list document into another document
    ///
    /// Examples:
    ///   docsync transform users.json active.json filter --params '{"key": "active", "value": true}'
    ///   docsync transform users.json by_age.json sort --params '{"key": "age", "order": "desc"}'
    ///   docsync transform users.json renamed.json map --params '{"field_map": {"name": "full_name"}}'
    Transform {
        /// Source list document
        input: String,

        /// Destination document
        output: String,

        /// Operation: filter, map or sort
        operation: String,

        /// Operation parameters as JSON
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Snapshot every document into a new backup version
    Backup,

    /// List backup versions
    Backups,

    /// Replace all documents with a backup version
    Restore {
        /// Backup version number
        version: u64,
    },

    /// Synchronize documents into the record store
    Sync {
        /// Target table (defaults to the configured table)
        #[arg(short, long)]
        table: Option<String>,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show sync history
    History {
        /// Only runs against this table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Write every synchronized record of a table into a document
    Export {
        /// Source table
        table: String,

        /// Destination document
        output: String,
    },

    /// Show document statistics
    Stats,

    /// Search documents for a value
    Search {
        /// Case-insensitive text to look for
        query: String,

        /// Only look in this field
        #[arg(short, long)]
        field: Option<String>,
    },

    /// Infer a schema from a sample document
    InferSchema {
        /// Sample document
        name: String,

        /// Mark every present field as required
        #[arg(long)]
        require_all: bool,

        /// Register the inferred schema under this name
        #[arg(long)]
        register: Option<String>,
    },

    /// List registered schemas
    Schemas,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_sync_with_options() {
        let cli = Cli::try_parse_from(["docsync", "sync", "--table", "people", "-w", "8"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Sync {
                table: Some("people".into()),
                workers: Some(8),
            }
        );
        assert!(!cli.json);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["docsync", "list", "--json", "--data-dir", "/tmp/data"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/data"));
    }

    #[test]
    fn parse_transform_defaults_params() {
        let cli =
            Cli::try_parse_from(["docsync", "transform", "a.json", "b.json", "sort"]).unwrap();
        match cli.command {
            Commands::Transform { params, .. } => assert_eq!(params, "{}"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn write_rejects_file_and_value_together() {
        let result = Cli::try_parse_from([
            "docsync", "write", "a.json", "--file", "x.json", "--value", "{}",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn restore_requires_numeric_version() {
        assert!(Cli::try_parse_from(["docsync", "restore", "latest"]).is_err());
    }
}
