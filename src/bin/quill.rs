//! Quill CLI Binary
//!
//! Template inspection and settings tooling for the quill pipeline.

use anyhow::Context;
use clap::Parser;
use quill::cli::{execute, Cli};
use quill::config::{ConfigLoader, PipelineSettings};
use quill::logging::{init_logging, LogFormat};
use std::process;
use tracing::{debug, error};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        error!("Command failed: {:#}", err);
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut settings =
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load settings")?;
    apply_logging_flags(cli, &mut settings)?;
    init_logging(&settings.logging).context("Failed to initialize logging")?;
    debug!("Quill CLI starting");

    let output = execute(&cli.command, &settings)?;
    println!("{}", output);
    Ok(())
}

/// CLI flags override the settings file.
fn apply_logging_flags(cli: &Cli, settings: &mut PipelineSettings) -> anyhow::Result<()> {
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        settings.logging.format = format.parse::<LogFormat>()?;
    }
    Ok(())
}
