//! CLI parse: clap types for Casegen. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Casegen CLI - API test-case generation with a local language model
#[derive(Parser)]
#[command(name = "casegen")]
#[command(about = "Generate API test cases from OpenAPI documents with a local language model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where config/ is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate test cases for every endpoint of an API description
    Generate {
        /// OpenAPI document (JSON or YAML)
        spec: PathBuf,
        /// Write the result to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Maximum in-flight model calls
        #[arg(long)]
        concurrency: Option<usize>,
        /// Model identifier
        #[arg(long)]
        model: Option<String>,
        /// Model service base URL
        #[arg(long)]
        host: Option<String>,
        /// Test cases requested per endpoint
        #[arg(long)]
        cases: Option<usize>,
        /// Retries per endpoint for network failures and timeouts
        #[arg(long)]
        retries: Option<u32>,
        /// Use the streaming completion endpoint
        #[arg(long)]
        stream: bool,
        /// Suppress progress lines on stderr
        #[arg(long)]
        no_progress: bool,
    },
    /// List models installed on the model service
    Models {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Pull the configured model onto the model service
    Pull {
        /// Model identifier (defaults to the configured model)
        model: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Validate only; print nothing on success
        #[arg(long)]
        check: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}
