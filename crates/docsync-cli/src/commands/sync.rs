//! Sync commands: sync, history, export
//!
//! These commands move documents between the data directory and the record
//! store and report on past runs.

use colored::Colorize;
use docsync_core::{Engine, RecordStatus, SyncOptions, SyncOutcome};

use super::Output;
use crate::error::{CliError, Result};

/// Run the sync command
///
/// A partial run exits successfully after listing what failed; a failed run
/// is an error.
pub fn run_sync(
    engine: &Engine,
    out: Output,
    table: Option<&str>,
    workers: Option<usize>,
) -> Result<()> {
    let table = table.unwrap_or(&engine.config().database.table).to_string();
    if !out.json {
        println!(
            "{} Synchronizing documents into {}...",
            "=>".blue().bold(),
            table.cyan()
        );
    }

    let options = SyncOptions {
        workers,
        ..SyncOptions::default()
    };
    let report = engine.sync_with(&table, &options)?;

    out.emit(&report, |report| {
        for record in &report.records {
            match record.status {
                RecordStatus::Written => {
                    println!("   {} {}", "+".green(), record.document);
                }
                RecordStatus::Skipped => {
                    println!("   {} {}", "=".dimmed(), record.document.dimmed());
                }
                RecordStatus::Failed => println!(
                    "   {} {}: {}",
                    "!".red(),
                    record.document.cyan(),
                    record.error.as_deref().unwrap_or("failed")
                ),
                RecordStatus::Cancelled => {
                    println!("   {} {} (cancelled)", "-".yellow(), record.document);
                }
            }
        }
        println!();
        let label = match report.outcome {
            SyncOutcome::Success => "SUCCESS".green().bold(),
            SyncOutcome::Partial => "PARTIAL".yellow().bold(),
            SyncOutcome::Failure => "FAILURE".red().bold(),
        };
        println!(
            "{} {} written, {} unchanged, {} failed",
            label, report.written, report.skipped, report.failed
        );
    })?;

    if report.outcome == SyncOutcome::Failure {
        return Err(CliError::user(format!("Sync into '{}' failed", table)));
    }
    Ok(())
}

pub fn run_history(engine: &Engine, out: Output, table: Option<&str>) -> Result<()> {
    let entries = engine.history(table)?;
    out.emit(&entries, |entries| {
        if entries.is_empty() {
            println!("{}", "No sync runs recorded.".dimmed());
            return;
        }
        for entry in entries {
            let outcome = match entry.outcome {
                SyncOutcome::Success => entry.outcome.as_str().green(),
                SyncOutcome::Partial => entry.outcome.as_str().yellow(),
                SyncOutcome::Failure => entry.outcome.as_str().red(),
            };
            println!(
                "{}  {:<16} {:<8} written {:>4}  skipped {:>4}  failed {:>4}",
                entry.started_at.format("%Y-%m-%d %H:%M:%S"),
                entry.table_name,
                outcome,
                entry.written,
                entry.skipped,
                entry.failed
            );
            if let Some(error) = &entry.error {
                println!("   {}", error.dimmed());
            }
        }
    })
}

pub fn run_export(engine: &Engine, out: Output, table: &str, output: &str) -> Result<()> {
    let report = engine.export(table, output)?;
    out.emit(&report, |report| {
        println!(
            "{} Exported {} record(s) from {} into {}",
            "OK".green().bold(),
            report.records,
            report.table.cyan(),
            report.output.name.cyan()
        );
    })
}
