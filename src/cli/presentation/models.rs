//! Installed-model listing.

use crate::error::GenerationError;
use crate::provider::ModelInfo;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

pub fn format_model_list_table(models: &[ModelInfo], configured: &str) -> String {
    if models.is_empty() {
        return format!(
            "No models installed.\n\nUse 'casegen pull' to fetch '{}'.",
            configured
        );
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Model", "Size", "Modified", "Configured"]);
    for model in models {
        table.add_row(vec![
            model.name.clone(),
            model.size.map(format_size).unwrap_or_else(|| "-".to_string()),
            model.modified_at.clone().unwrap_or_else(|| "-".to_string()),
            if is_configured(&model.name, configured) { "*" } else { "" }.to_string(),
        ]);
    }
    format!("{}\n\nTotal: {} model(s)", table, models.len())
}

pub fn format_model_list_json(models: &[ModelInfo]) -> Result<String, GenerationError> {
    serde_json::to_string_pretty(&json!({ "models": models, "total": models.len() }))
        .map_err(|e| GenerationError::Format(format!("Failed to serialize models: {}", e)))
}

/// `phi3` matches an installed `phi3:latest`.
fn is_configured(installed: &str, configured: &str) -> bool {
    installed == configured
        || installed
            .strip_suffix(":latest")
            .is_some_and(|base| base == configured)
}

fn format_size(bytes: u64) -> String {
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes >= GIB {
        format!("{:.1} GiB", bytes / GIB)
    } else {
        format!("{:.1} MiB", bytes / MIB)
    }
}
