//! CLI presentation: text, table and json formatters per command family.

mod models;
mod progress;
mod results;

pub use models::{format_model_list_json, format_model_list_table};
pub use progress::format_progress_line;
pub use results::{format_result_json, format_result_table};
