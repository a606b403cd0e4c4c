//! CLI domain: parse, route, help, output, and presentation only.
//! No pipeline logic; a single route table dispatches to the generation services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_model_list_json, format_model_list_table, format_progress_line, format_result_json,
    format_result_table,
};
pub use route::{CommandContext, GenerateOverrides};
