//! Ollama provider client (local models)

use crate::error::GenerationError;
use crate::provider::{
    build_provider_http_client, map_http_error, GenerationOptions, ModelClient,
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const PULL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Installed model as reported by `/api/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub digest: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

pub struct OllamaClient {
    client: Client,
    model: String,
    base_url: String,
    timeout: Duration,
    options: GenerationOptions,
}

impl OllamaClient {
    pub fn new(
        model: String,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GenerationError> {
        let timeout = timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if timeout.is_zero() {
            return Err(GenerationError::Config(
                "Model request timeout must be greater than zero".to_string(),
            ));
        }
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model
        };
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let client = build_provider_http_client(timeout)?;

        Ok(Self {
            client,
            model,
            base_url,
            timeout,
            options: GenerationOptions::default(),
        })
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// List installed models; doubles as a connectivity check.
    pub async fn check_connection(&self) -> Result<Vec<ModelInfo>, GenerationError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_http_error(e, self.timeout))?;
        let response = ensure_success(response).await?;
        let tags: TagsResponse = response.json().await.map_err(|e| {
            GenerationError::Model(format!("Failed to parse models response: {}", e))
        })?;
        info!(model = %self.model, base_url = %self.base_url, "Connected to model service");
        Ok(tags.models)
    }

    /// Ask the service to download the configured model.
    pub async fn pull_model(&self) -> Result<(), GenerationError> {
        info!(model = %self.model, "Pulling model");
        let url = format!("{}/api/pull", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(PULL_TIMEOUT)
            .json(&serde_json::json!({ "name": self.model, "stream": false }))
            .send()
            .await
            .map_err(|e| map_http_error(e, PULL_TIMEOUT))?;
        ensure_success(response).await?;
        info!(model = %self.model, "Model is ready");
        Ok(())
    }

    async fn send_generate(&self, prompt: &str, stream: bool) -> Result<Response, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream,
            options: &self.options,
        };
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| map_http_error(e, self.timeout))?;
        ensure_success(response).await
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let started = Instant::now();
        debug!(model = %self.model, prompt_chars = prompt.len(), "Generating completion");
        let response = self.send_generate(prompt, false).await?;
        let body = response
            .text()
            .await
            .map_err(|e| map_http_error(e, self.timeout))?;
        let envelope: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Model(format!("Invalid response envelope: {}", e)))?;

        if let Some(error) = envelope.error {
            return Err(GenerationError::Model(error));
        }
        match envelope.response {
            Some(text) if !text.is_empty() => {
                debug!(
                    model = envelope.model.as_deref().unwrap_or(&self.model),
                    done = envelope.done.unwrap_or(true),
                    duration_ms = started.elapsed().as_millis() as u64,
                    response_chars = text.len(),
                    "Completion generated"
                );
                Ok(text)
            }
            _ => Err(GenerationError::Model(
                "Response envelope is missing the `response` text".to_string(),
            )),
        }
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<String, GenerationError> {
        let response = self.send_generate(prompt, true).await?;
        let mut body = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut text = String::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| map_http_error(e, self.timeout))?;
            pending.extend_from_slice(&chunk);
            while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=newline).collect();
                apply_stream_line(&line, &mut text, on_chunk)?;
            }
        }
        if !pending.is_empty() {
            apply_stream_line(&pending, &mut text, on_chunk)?;
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Decode one NDJSON fragment; malformed or textless fragments are ignored.
fn apply_stream_line(
    line: &[u8],
    text: &mut String,
    on_chunk: &mut (dyn for<'s> FnMut(&'s str) + Send),
) -> Result<(), GenerationError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    let fragment: GenerateResponse = match serde_json::from_str(line) {
        Ok(fragment) => fragment,
        Err(err) => {
            warn!(error = %err, "Ignoring malformed stream fragment");
            return Ok(());
        }
    };
    if let Some(error) = fragment.error {
        return Err(GenerationError::Model(error));
    }
    if let Some(piece) = fragment.response.filter(|p| !p.is_empty()) {
        on_chunk(&piece);
        text.push_str(&piece);
    }
    Ok(())
}

async fn ensure_success(response: Response) -> Result<Response, GenerationError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(GenerationError::Model(format!(
        "Request failed with status {}: {}",
        status, error_text
    )))
}
