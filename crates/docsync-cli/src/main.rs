//! docsync CLI
//!
//! The command-line interface for validating, transforming, backing up and
//! synchronizing a directory of JSON documents.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use docsync_core::Engine;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use commands::Output;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let result = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    if let Err(e) = result {
        eprintln!("{}: {}", "warning".yellow().bold(), e);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(data_dir = %cli.data_dir.display(), "Opening data directory");

    let engine = Engine::open(&cli.data_dir)?;
    let out = Output { json: cli.json };
    execute_command(&engine, out, cli.command)
}

fn execute_command(engine: &Engine, out: Output, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Validate => commands::run_validate(engine, out),
        Commands::Read { name } => commands::run_read(engine, out, &name),
        Commands::Write {
            name,
            file,
            value,
            validate,
        } => commands::run_write(
            engine,
            out,
            &name,
            file.as_deref(),
            value.as_deref(),
            validate,
        ),
        Commands::Delete { name } => commands::run_delete(engine, out, &name),
        Commands::List => commands::run_list(engine, out),
        Commands::Merge {
            pattern,
            destination,
        } => commands::run_merge(engine, out, &pattern, &destination),
        Commands::Transform {
            input,
            output,
            operation,
            params,
        } => commands::run_transform(engine, out, &input, &output, &operation, &params),
        Commands::Backup => commands::run_backup(engine, out),
        Commands::Backups => commands::run_backups(engine, out),
        Commands::Restore { version } => commands::run_restore(engine, out, version),
        Commands::Sync { table, workers } => {
            commands::run_sync(engine, out, table.as_deref(), workers)
        }
        Commands::History { table } => commands::run_history(engine, out, table.as_deref()),
        Commands::Export { table, output } => commands::run_export(engine, out, &table, &output),
        Commands::Stats => commands::run_stats(engine, out),
        Commands::Search { query, field } => {
            commands::run_search(engine, out, &query, field.as_deref())
        }
        Commands::InferSchema {
            name,
            require_all,
            register,
        } => commands::run_infer_schema(engine, out, &name, require_all, register.as_deref()),
        Commands::Schemas => commands::run_schemas(engine, out),
    }
}
