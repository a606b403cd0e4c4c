//! Casegen CLI Binary
//!
//! Command-line interface for generating API test cases with a local language model.

use anyhow::{anyhow, Context};
use casegen::cli::{map_error, Cli, CommandContext};
use casegen::config::ConfigLoader;
use casegen::logging::{init_logging, LoggingConfig};
use clap::Parser;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Casegen CLI starting");

    if let Err(e) = run(&cli) {
        error!("Command failed: {:#}", e);
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let context = CommandContext::new(cli.workspace.clone(), cli.config.clone())
        .map_err(|e| anyhow!(map_error(&e)))
        .context("Failed to load configuration")?;
    info!("CLI context initialized");

    let output = runtime
        .block_on(context.execute(&cli.command))
        .map_err(|e| anyhow!(map_error(&e)))?;
    println!("{}", output);
    Ok(())
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }

    config
}
