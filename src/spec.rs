//! API description documents
//!
//! Typed view over an already validated OpenAPI document: the HTTP verbs the generator
//! understands, the per-operation fields it feeds into prompts, and loading a document
//! from a JSON or YAML file. Key order is preserved so endpoints come out in the order
//! the document declares them.

use crate::error::GenerationError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::debug;

pub mod walker;

pub use walker::SpecWalker;

/// HTTP verbs that produce endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    /// Parse a path-item key. Anything outside the recognized verb set is `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(key))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
        }
    }

    pub fn as_upper(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

/// Operation fields used for generation. Schemas stay as raw JSON; they are only echoed
/// into the prompt.
///
/// Decoding never fails on a mapping: text fields of the wrong type read as absent and a
/// `parameters` value that is not a sequence is dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "operationId",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_id: Option<String>,
    #[serde(
        default,
        rename = "requestBody",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub parameters: Option<Vec<Value>>,
}

impl Operation {
    /// Decode an operation value. Anything that is not a mapping (`null`, a string, a
    /// sequence) yields an empty operation.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::deserialize(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items),
        _ => None,
    })
}

/// One (method, path) pair with its operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub operation: Operation,
}

impl EndpointDescriptor {
    /// Human-readable `GET /users` form used in logs and progress events.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Title and version from the document's `info` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecInfo {
    pub title: Option<String>,
    pub version: Option<String>,
}

/// A document accepted at the pipeline boundary: guaranteed to be a JSON object.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    root: Value,
}

impl SpecDocument {
    pub fn from_value(root: Value) -> Result<Self, GenerationError> {
        if !root.is_object() {
            return Err(GenerationError::Validation(format!(
                "API description must be an object, got {}",
                json_type_name(&root)
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn info(&self) -> SpecInfo {
        let info = self.root.get("info");
        let field = |name: &str| {
            info.and_then(|i| i.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        SpecInfo {
            title: field("title"),
            version: field("version"),
        }
    }

    /// Walker over the document's paths; fails when `paths` is missing or not a mapping.
    pub fn walker(&self) -> Result<SpecWalker<'_>, GenerationError> {
        SpecWalker::from_document(&self.root)
    }
}

/// Supported on-disk document encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DocumentFormat::Json),
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DocumentFormat::Json => "JSON",
            DocumentFormat::Yaml => "YAML",
        }
    }
}

/// Parse document text in the given format.
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<Value, GenerationError> {
    let parsed = match format {
        DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| {
        GenerationError::Input(format!("Document is not valid {}: {}", format.name(), e))
    })
}

/// Read a `.json`, `.yaml` or `.yml` document from disk.
pub fn load_document(path: &Path) -> Result<Value, GenerationError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        GenerationError::Input(format!(
            "Unsupported file type {}. Use a .json or .yaml/.yml file.",
            path.display()
        ))
    })?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        GenerationError::Input(format!("Failed to read {}: {}", path.display(), e))
    })?;
    debug!(path = %path.display(), format = format.name(), "Parsing API description");
    parse_document(&content, format)
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
