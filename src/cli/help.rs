//! CLI command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string for log fields (e.g. "generate", "models").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::Models { .. } => "models",
        Commands::Pull { .. } => "pull",
        Commands::Config { .. } => "config",
    }
}
