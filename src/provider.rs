//! Model Provider Abstraction
//!
//! A single seam, [`ModelClient`], between the generation pipeline and the text-completion
//! service that writes test cases. The pipeline only needs "prompt in, text out"; the
//! Ollama-compatible HTTP implementation lives in [`ollama`].

use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod ollama;

pub use ollama::{ModelInfo, OllamaClient};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "phi3";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sampling options forwarded to the model service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Maximum tokens to generate (`num_predict` on the wire)
    #[serde(rename = "num_predict", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            top_p: Some(0.9),
            top_k: None,
            max_tokens: Some(1000),
            repeat_penalty: None,
            seed: None,
            stop: None,
        }
    }
}

/// Text-completion client used by the orchestrator.
///
/// Implementations must resolve every call within their configured deadline: success,
/// a typed failure, or [`GenerationError::Timeout`]. They never retry internally.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// One non-streaming completion.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Streaming completion. `on_chunk` sees each text fragment in arrival order; the
    /// concatenated text is returned.
    async fn generate_stream(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, GenerationError> {
        let text = self.generate(prompt).await?;
        on_chunk(&text);
        Ok(text)
    }

    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, GenerationError> {
        (**self).generate_stream(prompt, on_chunk).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

fn build_provider_http_client(request_timeout: Duration) -> Result<Client, GenerationError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
        .map_err(|e| GenerationError::Config(format!("Failed to create HTTP client: {}", e)))
}

// Map transport failures onto the pipeline taxonomy
fn map_http_error(error: reqwest::Error, timeout: Duration) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Timeout(timeout)
    } else if error.is_connect() {
        GenerationError::Network(format!("Connection error: {}", error))
    } else if error.is_decode() {
        GenerationError::Model(format!("Failed to decode response: {}", error))
    } else if error.is_status() {
        let status = error
            .status()
            .map(|s| s.as_u16().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        GenerationError::Model(format!("Request failed with status {}: {}", status, error))
    } else {
        GenerationError::Network(format!("HTTP error: {}", error))
    }
}
