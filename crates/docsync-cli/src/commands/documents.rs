//! Document commands: read, write, delete, list, merge, transform, stats, search

use std::path::Path;

use colored::Colorize;
use docsync_core::{Engine, TransformRequest};
use serde_json::{Value, json};

use super::Output;
use crate::error::{CliError, Result};

pub fn run_read(engine: &Engine, out: Output, name: &str) -> Result<()> {
    let doc = engine.read(name)?;
    tracing::debug!(checksum = %doc.meta.checksum, size = doc.meta.size_bytes, "Read document");
    if out.json {
        // Document plus metadata
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&doc.value)?);
    }
    Ok(())
}

/// Parse the value to write from `--file` or `--value`.
fn load_value(file: Option<&Path>, value: Option<&str>) -> Result<Value> {
    match (file, value) {
        (Some(path), None) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        (None, Some(text)) => Ok(serde_json::from_str(text)?),
        (None, None) => Err(CliError::user("Provide the value with --file or --value")),
        (Some(_), Some(_)) => Err(CliError::user("Use either --file or --value, not both")),
    }
}

pub fn run_write(
    engine: &Engine,
    out: Output,
    name: &str,
    file: Option<&Path>,
    value: Option<&str>,
    validate: bool,
) -> Result<()> {
    let value = load_value(file, value)?;
    let meta = if validate {
        engine.write_validated(name, &value)?
    } else {
        engine.write(name, &value)?
    };

    out.emit(&meta, |meta| {
        println!(
            "{} Wrote {} ({} bytes)",
            "OK".green().bold(),
            meta.name.cyan(),
            meta.size_bytes
        );
    })
}

pub fn run_delete(engine: &Engine, out: Output, name: &str) -> Result<()> {
    engine.delete(name)?;
    out.emit(&json!({"deleted": name}), |_| {
        println!("{} Deleted {}", "OK".green().bold(), name.cyan());
    })
}

pub fn run_list(engine: &Engine, out: Output) -> Result<()> {
    let names = engine.list()?;
    out.emit(&names, |names| {
        if names.is_empty() {
            println!("{}", "No documents.".dimmed());
        }
        for name in names {
            println!("{}", name);
        }
    })
}

pub fn run_merge(engine: &Engine, out: Output, pattern: &str, destination: &str) -> Result<()> {
    let report = engine.merge(pattern, destination)?;
    out.emit(&report, |report| {
        println!(
            "{} Merged {} document(s) into {}",
            "OK".green().bold(),
            report.sources.len(),
            report.destination.name.cyan()
        );
        for source in &report.sources {
            println!("   {} {}", "+".green(), source);
        }
    })
}

pub fn run_transform(
    engine: &Engine,
    out: Output,
    input: &str,
    output: &str,
    operation: &str,
    params: &str,
) -> Result<()> {
    let request = TransformRequest {
        input_filename: input.to_string(),
        output_filename: output.to_string(),
        operation: operation.to_string(),
        parameters: serde_json::from_str(params)?,
    };
    let report = engine.transform(&request)?;

    out.emit(&report, |report| {
        println!(
            "{} {} {} -> {} ({} -> {} items)",
            "OK".green().bold(),
            report.operation.bold(),
            input.cyan(),
            report.output.name.cyan(),
            report.input_count,
            report.output_count
        );
    })
}

pub fn run_stats(engine: &Engine, out: Output) -> Result<()> {
    let stats = engine.statistics()?;
    out.emit(&stats, |stats| {
        println!("{}", "Statistics".bold());
        println!();
        println!("  {:<12} {}", "Documents:", stats.total_files);
        println!(
            "  {:<12} {} bytes ({} KB, {} MB)",
            "Size:", stats.total_size_bytes, stats.total_size_kb, stats.total_size_mb
        );
        if !stats.categories.is_empty() {
            println!();
            println!("{}:", "Categories".cyan().bold());
            for (category, count) in &stats.categories {
                println!("  {:<14} {}", category.green(), count);
            }
        }
        if !stats.files.is_empty() {
            println!();
            println!("{}:", "Files".cyan().bold());
            for file in &stats.files {
                println!(
                    "  {:<24} {:>10} bytes  {}",
                    file.name,
                    file.size_bytes,
                    file.modified.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
                );
            }
        }
    })
}

pub fn run_search(engine: &Engine, out: Output, query: &str, field: Option<&str>) -> Result<()> {
    let hits = engine.search(query, field)?;
    out.emit(&hits, |hits| {
        if hits.is_empty() {
            println!("{} No matches for '{}'", "=>".blue().bold(), query);
            return;
        }
        println!("{} {} match(es):", "=>".blue().bold(), hits.len());
        for hit in hits {
            println!("   {} {}", hit.file.cyan(), hit.data);
        }
    })
}
