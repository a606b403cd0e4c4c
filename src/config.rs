//! Configuration System
//!
//! Hierarchical configuration for the model connection, generation behavior and logging.
//! See [`ConfigLoader`] for the layer order.

use crate::error::GenerationError;
use crate::generation::GenerationSettings;
use crate::logging::{parse_format, parse_output, LoggingConfig};
use crate::prompt::DEFAULT_CASES_PER_ENDPOINT;
use crate::provider::{
    GenerationOptions, OllamaClient, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::environment::clean_env_value;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CasegenConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model service connection and sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the Ollama-compatible service
    #[serde(default = "default_host")]
    pub host: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub name: String,

    /// Per-request deadline
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_host() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            name: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sampling options: configured values over the service defaults.
    pub fn options(&self) -> GenerationOptions {
        let defaults = GenerationOptions::default();
        GenerationOptions {
            temperature: self.temperature.or(defaults.temperature),
            top_p: self.top_p.or(defaults.top_p),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            ..defaults
        }
    }

    pub fn build_client(&self) -> Result<OllamaClient, GenerationError> {
        Ok(OllamaClient::new(
            self.name.clone(),
            Some(self.host.clone()),
            Some(self.timeout()),
        )?
        .with_options(self.options()))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host cannot be empty".to_string());
        }
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(format!(
                "Host must be an http(s) URL, got '{}'",
                self.host
            ));
        }
        if self.name.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than zero".to_string());
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    temperature
                ));
            }
        }
        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(format!("top_p must be between 0.0 and 1.0, got {}", top_p));
            }
        }
        Ok(())
    }
}

/// Orchestration behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_cases_per_endpoint")]
    pub cases_per_endpoint: usize,

    /// Recent progress events replayed to late subscribers (0 disables)
    #[serde(default)]
    pub history_capacity: usize,

    #[serde(default)]
    pub stream: bool,
}

fn default_concurrency() -> usize {
    1
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_cases_per_endpoint() -> usize {
    DEFAULT_CASES_PER_ENDPOINT
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            cases_per_endpoint: default_cases_per_endpoint(),
            history_capacity: 0,
            stream: false,
        }
    }
}

impl GenerationConfig {
    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            concurrency: self.concurrency,
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
            cases_per_endpoint: self.cases_per_endpoint,
            stream: self.stream,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("Concurrency must be at least 1".to_string());
        }
        if self.cases_per_endpoint == 0 {
            return Err("cases_per_endpoint must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Model(String),
    Generation(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Model(msg) => write!(f, "Model: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl CasegenConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.model.validate() {
            errors.push(ValidationError::Model(e));
        }
        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }
        if let Err(e) = parse_format(&self.logging.format) {
            errors.push(ValidationError::Logging(e.to_string()));
        }
        if let Err(e) = parse_output(&self.logging.output) {
            errors.push(ValidationError::Logging(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one error.
    pub fn ensure_valid(&self) -> Result<(), GenerationError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            GenerationError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }

    pub fn to_toml(&self) -> Result<String, GenerationError> {
        toml::to_string_pretty(self)
            .map_err(|e| GenerationError::Config(format!("Failed to render configuration: {}", e)))
    }
}
