//! Error types for the test-case generation pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The document has no usable `paths` mapping. Aborts the run.
    #[error("Input error: {0}")]
    Input(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Repair failed: {0}")]
    Repair(String),

    /// A caller broke a pipeline precondition.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Stable category of a failure, carried into failure entries and progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Input,
    Network,
    Timeout,
    Model,
    Format,
    Repair,
    Validation,
    Config,
}

impl GenerationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GenerationError::Input(_) => FailureKind::Input,
            GenerationError::Network(_) => FailureKind::Network,
            GenerationError::Timeout(_) => FailureKind::Timeout,
            GenerationError::Model(_) => FailureKind::Model,
            GenerationError::Format(_) => FailureKind::Format,
            GenerationError::Repair(_) => FailureKind::Repair,
            GenerationError::Validation(_) => FailureKind::Validation,
            GenerationError::Config(_) => FailureKind::Config,
        }
    }

    /// Transient transport failures; everything else repeats deterministically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Network(_) | GenerationError::Timeout(_)
        )
    }
}

impl From<config::ConfigError> for GenerationError {
    fn from(err: config::ConfigError) -> Self {
        GenerationError::Config(err.to_string())
    }
}
