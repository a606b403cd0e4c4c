//! Prompt construction for test-case generation.
//!
//! Pure: the same endpoint always renders to the same prompt text.

use crate::spec::{EndpointDescriptor, HttpMethod, Operation};
use serde_json::Value;

pub const DEFAULT_CASES_PER_ENDPOINT: usize = 3;

const NOT_AVAILABLE: &str = "N/A";

/// (method, path, operation) for one endpoint, borrowed for the duration of one call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub operation: &'a Operation,
}

impl<'a> From<&'a EndpointDescriptor> for GenerationRequest<'a> {
    fn from(endpoint: &'a EndpointDescriptor) -> Self {
        Self {
            method: endpoint.method,
            path: &endpoint.path,
            operation: &endpoint.operation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    cases_per_endpoint: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            cases_per_endpoint: DEFAULT_CASES_PER_ENDPOINT,
        }
    }
}

impl PromptBuilder {
    pub fn new(cases_per_endpoint: usize) -> Self {
        Self {
            cases_per_endpoint: cases_per_endpoint.max(1),
        }
    }

    pub fn cases_per_endpoint(&self) -> usize {
        self.cases_per_endpoint
    }

    pub fn build(&self, request: GenerationRequest<'_>) -> String {
        let role_and_task = format!(
            "You are an expert QA automation engineer. Your sole purpose is to generate \
             comprehensive and diverse test cases for REST API endpoints.\n\
             Generate {} {} for the following API endpoint. Focus on creating distinct \
             scenarios for valid, edge, and invalid inputs.",
            self.cases_per_endpoint,
            if self.cases_per_endpoint == 1 { "test case" } else { "test cases" }
        );
        let rules = output_contract(request.method, request.path);
        let context = endpoint_context(request);
        format!("{role_and_task}\n\n{rules}\n\n{context}\n\nJSON Response:\n")
    }
}

/// Render with the default case count.
pub fn build_prompt(method: HttpMethod, path: &str, operation: &Operation) -> String {
    PromptBuilder::default().build(GenerationRequest {
        method,
        path,
        operation,
    })
}

fn output_contract(method: HttpMethod, path: &str) -> String {
    format!(
        "CRITICAL: You must respond with a valid JSON array of objects, nothing else. \
         Do not include any explanations, markdown, or extra text.\n\
         Each test case object in the array MUST have the following exact fields:\n\
         - \"name\": a descriptive string (e.g., \"Create user - valid input\")\n\
         - \"category\": a string, must be one of: \"valid\", \"edge\", or \"invalid\"\n\
         - \"method\": the HTTP method as a string (e.g., \"{method}\")\n\
         - \"endpoint\": the API path as a string (e.g., \"{path}\")\n\
         - \"headers\": an object for HTTP headers (e.g., {{ \"Content-Type\": \"application/json\" }}) or null\n\
         - \"body\": an object for the request body or null\n\
         - \"expected_response_code\": an integer for the expected HTTP status code (e.g., 200, 400, 201)",
        method = method.as_upper(),
        path = path,
    )
}

fn endpoint_context(request: GenerationRequest<'_>) -> String {
    let op = request.operation;
    format!(
        "API ENDPOINT DEFINITION:\n\
         Method: {method}\n\
         Path: {path}\n\
         Summary: {summary}\n\
         Description: {description}\n\
         Request Body Schema: {request_body}\n\
         Responses: {responses}",
        method = request.method.as_upper(),
        path = request.path,
        summary = text_or_na(op.summary.as_deref()),
        description = text_or_na(op.description.as_deref()),
        request_body = schema_text(op.request_body.as_ref()),
        responses = schema_text(op.responses.as_ref()),
    )
}

fn text_or_na(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => NOT_AVAILABLE,
    }
}

fn schema_text(value: Option<&Value>) -> String {
    match value {
        Some(schema) if !schema.is_null() => {
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string())
        }
        _ => "{}".to_string(),
    }
}
