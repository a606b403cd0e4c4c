//! Model output normalization
//!
//! Turns raw completion text into test-case candidates. Model output is untrusted: it may
//! arrive inside a markdown fence, surrounded by prose, or with the usual hand-written
//! JSON slips (trailing commas, bare keys, single quotes). A strict decode is always tried
//! first; [`repair`] only runs when that fails.
//!
//! Normalization is structural. Field checks (category, status code) happen in
//! [`TestCaseCandidate::resolve`], once the endpoint the batch belongs to is known. Either
//! way a single bad element fails the whole batch.

use crate::error::GenerationError;
use crate::spec::{json_type_name, EndpointDescriptor};
use crate::types::{TestCase, TestCategory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub mod repair;

/// One array element as the model wrote it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseCandidate {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub expected_response_code: Option<Value>,
}

/// Decoded candidates plus whether the repair pass was needed.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub candidates: Vec<TestCaseCandidate>,
    pub repaired: bool,
}

/// Normalize raw model text into candidates.
pub fn normalize(raw: &str) -> Result<NormalizedBatch, GenerationError> {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        return Err(GenerationError::Format("Model returned empty output".to_string()));
    }

    let (value, repaired) = match serde_json::from_str::<Value>(text) {
        Ok(value) => (value, false),
        Err(strict_err) => {
            debug!(error = %strict_err, "Strict decode failed; attempting repair");
            let fixed = repair::repair_json(text);
            let value = serde_json::from_str::<Value>(&fixed).map_err(|e| {
                GenerationError::Repair(format!(
                    "Output is not JSON even after repair ({}); strict decode error: {}",
                    e, strict_err
                ))
            })?;
            (value, true)
        }
    };

    let Value::Array(elements) = value else {
        return Err(GenerationError::Format(format!(
            "Expected a JSON array of test cases, got {}",
            json_type_name(&value)
        )));
    };

    let candidates = elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            TestCaseCandidate::deserialize(element).map_err(|e| {
                GenerationError::Format(format!("Test case #{} is malformed: {}", index + 1, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NormalizedBatch {
        candidates,
        repaired,
    })
}

/// Trim and remove a surrounding markdown code fence (with optional language tag).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
        .unwrap_or(rest.len());
    let body = &rest[tag_len..];
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

impl TestCaseCandidate {
    /// Validate fields and fill `method`/`endpoint` from the endpoint when the model left
    /// them out.
    pub fn resolve(self, endpoint: &EndpointDescriptor) -> Result<TestCase, GenerationError> {
        let invalid = |detail: String| {
            GenerationError::Format(format!("Test case '{}': {}", self.name, detail))
        };

        let category = match self.category.as_deref() {
            Some(raw) => raw.parse::<TestCategory>().map_err(invalid)?,
            None => return Err(invalid("missing category".to_string())),
        };

        let expected_response_code = match &self.expected_response_code {
            Some(code) => parse_status_code(code).map_err(invalid)?,
            None => return Err(invalid("missing expected_response_code".to_string())),
        };

        let headers = match &self.headers {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(other) => {
                return Err(invalid(format!(
                    "headers must be an object or null, got {}",
                    json_type_name(other)
                )))
            }
        };

        let method = self
            .method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| endpoint.method.as_upper().to_string());
        let path = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| endpoint.path.clone());
        let body = self.body.clone().filter(|b| !b.is_null());

        Ok(TestCase {
            name: self.name,
            category,
            method,
            endpoint: path,
            headers,
            body,
            expected_response_code,
        })
    }
}

fn parse_status_code(value: &Value) -> Result<u16, String> {
    let code = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match code {
        Some(code) if (100..=599).contains(&code) => Ok(code as u16),
        Some(code) => Err(format!("expected_response_code {} is not an HTTP status", code)),
        None => Err(format!(
            "expected_response_code must be an integer, got {}",
            value
        )),
    }
}

/// Normalize and resolve in one step.
pub fn normalize_for_endpoint(
    raw: &str,
    endpoint: &EndpointDescriptor,
) -> Result<(Vec<TestCase>, bool), GenerationError> {
    let batch = normalize(raw)?;
    let cases = batch
        .candidates
        .into_iter()
        .map(|candidate| candidate.resolve(endpoint))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((cases, batch.repaired))
}
