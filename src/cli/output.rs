//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::GenerationError;

/// Map domain errors to a string for CLI output, with a hint where one helps.
pub fn map_error(e: &GenerationError) -> String {
    match e {
        GenerationError::Network(_) | GenerationError::Timeout(_) => format!(
            "{}\nIs the model service running? Check `model.host` or OLLAMA_HOST.",
            e
        ),
        _ => e.to_string(),
    }
}
