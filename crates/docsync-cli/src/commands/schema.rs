//! Schema commands: validate, schemas, infer-schema

use colored::Colorize;
use docsync_core::Engine;
use serde_json::json;

use super::Output;
use crate::error::{CliError, Result};

/// Validate every document; fails when any document is invalid.
pub fn run_validate(engine: &Engine, out: Output) -> Result<()> {
    let summary = engine.validate_all()?;

    out.emit(&summary, |summary| {
        println!("{} Validating documents...", "=>".blue().bold());
        for result in &summary.results {
            let schema = result.schema.as_deref().unwrap_or("-");
            if result.valid {
                println!(
                    "   {} {} ({})",
                    "OK".green().bold(),
                    result.document,
                    schema.dimmed()
                );
            } else {
                println!(
                    "   {} {} ({}): {}",
                    "INVALID".red().bold(),
                    result.document.cyan(),
                    schema.dimmed(),
                    result.description.as_deref().unwrap_or("invalid")
                );
            }
        }
        println!();
        println!(
            "{} valid, {} invalid, {} total",
            summary.valid.to_string().green(),
            summary.invalid.to_string().red(),
            summary.total
        );
    })?;

    if summary.invalid > 0 {
        return Err(CliError::user(format!(
            "{} document(s) failed validation",
            summary.invalid
        )));
    }
    Ok(())
}

pub fn run_schemas(engine: &Engine, out: Output) -> Result<()> {
    let names: Vec<String> = engine.schemas().collect();
    out.emit(&names, |names| {
        if names.is_empty() {
            println!("{}", "No schemas registered.".dimmed());
        }
        for name in names {
            println!("{}", name);
        }
    })
}

pub fn run_infer_schema(
    engine: &Engine,
    out: Output,
    name: &str,
    require_all: bool,
    register: Option<&str>,
) -> Result<()> {
    let schema = engine.infer_schema(name, require_all)?;

    if let Some(schema_name) = register {
        engine.register_schema(schema_name, schema.clone())?;
        if !out.json {
            println!(
                "{} Registered schema {}",
                "OK".green().bold(),
                schema_name.cyan()
            );
        }
    }

    if out.json {
        let payload = json!({"schema": schema, "registered": register});
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    }
    Ok(())
}
