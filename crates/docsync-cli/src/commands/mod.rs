//! Command implementations for docsync-cli

pub mod backup;
pub mod documents;
pub mod schema;
pub mod sync;

pub use backup::{run_backup, run_backups, run_restore};
pub use documents::{
    run_delete, run_list, run_merge, run_read, run_search, run_stats, run_transform, run_write,
};
pub use schema::{run_infer_schema, run_schemas, run_validate};
pub use sync::{run_export, run_history, run_sync};

use serde::Serialize;

use crate::error::Result;

/// How command results are printed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Print `value` as pretty JSON in JSON mode, otherwise call `human`.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}
