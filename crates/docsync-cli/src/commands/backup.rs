//! Backup commands: backup, backups, restore

use colored::Colorize;
use docsync_core::Engine;

use super::Output;
use crate::error::Result;

pub fn run_backup(engine: &Engine, out: Output) -> Result<()> {
    let manifest = engine.create_backup()?;
    out.emit(&manifest, |manifest| {
        println!(
            "{} Created backup version {} ({} document(s))",
            "OK".green().bold(),
            manifest.version.to_string().cyan(),
            manifest.documents.len()
        );
    })
}

pub fn run_backups(engine: &Engine, out: Output) -> Result<()> {
    let manifests = engine.list_backups()?;
    out.emit(&manifests, |manifests| {
        if manifests.is_empty() {
            println!("{}", "No backups.".dimmed());
            return;
        }
        println!("{}", "Backups".bold());
        println!();
        for manifest in manifests {
            println!(
                "  {:<6} {}  {} document(s)",
                format!("v{}", manifest.version).green(),
                manifest.created.format("%Y-%m-%d %H:%M:%S"),
                manifest.documents.len()
            );
        }
    })
}

pub fn run_restore(engine: &Engine, out: Output, version: u64) -> Result<()> {
    let report = engine.restore(version)?;
    out.emit(&report, |report| {
        println!(
            "{} Restored version {} ({} document(s))",
            "OK".green().bold(),
            report.version.to_string().cyan(),
            report.restored.len()
        );
    })
}
