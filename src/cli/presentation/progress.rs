//! Live progress lines for stderr.

use crate::progress::{ProgressEnvelope, ProgressEvent};
use owo_colors::OwoColorize;

fn marker(symbol: &str, color: bool, paint: fn(&str) -> String) -> String {
    if color {
        paint(symbol)
    } else {
        symbol.to_string()
    }
}

/// One line per event a terminal user cares about; transport-only events yield `None`.
pub fn format_progress_line(envelope: &ProgressEnvelope, color: bool) -> Option<String> {
    let line = match &envelope.event {
        ProgressEvent::RunStarted(d) => {
            let head = format!(
                "Generating tests for {} ({} endpoint(s))",
                d.title.as_deref().unwrap_or("API"),
                d.total_endpoints
            );
            if color {
                format!("{}", head.bold())
            } else {
                head
            }
        }
        ProgressEvent::GenerationStarted(d) => format!(
            "{} {} {}",
            marker("…", color, |s| s.dimmed().to_string()),
            d.method,
            d.endpoint
        ),
        ProgressEvent::GenerationCompleted(d) => format!(
            "{} {} {}: {} case(s) in {} ms{}",
            marker("✓", color, |s| s.green().to_string()),
            d.method,
            d.endpoint,
            d.count,
            d.duration_ms,
            if d.repaired { " (repaired)" } else { "" }
        ),
        ProgressEvent::GenerationFailed(d) => format!(
            "{} {} {}: {}",
            marker("✗", color, |s| s.red().to_string()),
            d.method,
            d.endpoint,
            d.reason
        ),
        ProgressEvent::GenerationSkipped(d) => format!(
            "{} {} {}: skipped",
            marker("-", color, |s| s.yellow().to_string()),
            d.method,
            d.endpoint
        ),
        ProgressEvent::RunFinished(d) => format!(
            "Done in {} ms: {} endpoint(s) generated, {} failed{}",
            d.duration_ms,
            d.generated,
            d.failed,
            if d.cancelled { ", cancelled" } else { "" }
        ),
        ProgressEvent::UploadStarted(_)
        | ProgressEvent::UploadConfirmed(_)
        | ProgressEvent::RequestReceived(_)
        | ProgressEvent::RequestCancelled(_) => return None,
    };
    Some(line)
}
