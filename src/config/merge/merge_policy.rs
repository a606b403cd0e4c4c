//! Merge rules: defaults, override order, conflict handling.
//!
//! Layers are added lowest precedence first: these defaults, the global file, the
//! workspace files, `CASEGEN__*` environment variables, then the legacy `OLLAMA_HOST` /
//! `MODEL_NAME` overrides.

use crate::provider::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("model.host", DEFAULT_BASE_URL)?
        .set_default("model.name", DEFAULT_MODEL)?
        .set_default("model.timeout_secs", DEFAULT_REQUEST_TIMEOUT.as_secs())?
        .set_default("generation.concurrency", 1_u64)?
        .set_default("generation.max_retries", 0_u64)?
        .set_default("generation.retry_delay_ms", 1000_u64)?
        .set_default("generation.history_capacity", 0_u64)
}
