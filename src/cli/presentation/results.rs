//! Generation result presentation: json document or summary tables.

use crate::error::GenerationError;
use crate::generation::{AggregateResult, EndpointStatus};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_result_json(result: &AggregateResult) -> Result<String, GenerationError> {
    serde_json::to_string_pretty(result)
        .map_err(|e| GenerationError::Format(format!("Failed to serialize result: {}", e)))
}

pub fn format_result_table(result: &AggregateResult) -> String {
    let mut cases = Table::new();
    cases.load_preset(UTF8_BORDERS_ONLY);
    cases.set_header(vec!["Method", "Endpoint", "Category", "Expected", "Name"]);
    for case in &result.test_cases {
        cases.add_row(vec![
            case.method.clone(),
            case.endpoint.clone(),
            case.category.to_string(),
            case.expected_response_code.to_string(),
            case.name.clone(),
        ]);
    }

    let mut endpoints = Table::new();
    endpoints.load_preset(UTF8_BORDERS_ONLY);
    endpoints.set_header(vec!["Method", "Endpoint", "Status", "Cases", "Repaired"]);
    for summary in &result.endpoints {
        let status = match summary.status {
            EndpointStatus::Generated => "generated",
            EndpointStatus::Failed => "failed",
            EndpointStatus::Skipped => "skipped",
        };
        endpoints.add_row(vec![
            summary.method.clone(),
            summary.path.clone(),
            status.to_string(),
            summary.case_count.to_string(),
            if summary.repaired { "yes" } else { "" }.to_string(),
        ]);
    }

    let counts = result.category_counts();
    let mut out = format!("Test cases ({}):\n{}\n\n", result.test_cases.len(), cases);
    out.push_str(&format!("Endpoints:\n{}\n", endpoints));
    out.push_str(&format!(
        "\nvalid: {}  edge: {}  invalid: {}",
        counts.valid, counts.edge, counts.invalid
    ));
    if !result.failures.is_empty() {
        out.push_str(&format!("\n\nFailures ({}):", result.failures.len()));
        for failure in &result.failures {
            out.push_str(&format!(
                "\n  - {} {}: {}",
                failure.method, failure.endpoint, failure.reason
            ));
        }
    }
    if result.cancelled {
        out.push_str("\n\nRun was cancelled; results are partial.");
    }
    out
}
