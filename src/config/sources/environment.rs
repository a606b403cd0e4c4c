//! Environment sources: `CASEGEN__SECTION__KEY` variables and the legacy
//! `OLLAMA_HOST` / `MODEL_NAME` pair.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment};

pub const ENV_PREFIX: &str = "CASEGEN";
pub const LEGACY_HOST_VAR: &str = "OLLAMA_HOST";
pub const LEGACY_MODEL_VAR: &str = "MODEL_NAME";

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    if let Some(host) = read_legacy(LEGACY_HOST_VAR) {
        builder = builder.set_override("model.host", host)?;
    }
    if let Some(model) = read_legacy(LEGACY_MODEL_VAR) {
        builder = builder.set_override("model.name", model)?;
    }
    Ok(builder)
}

fn read_legacy(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|raw| clean_env_value(&raw))
}

/// Strip surrounding quotes and force IPv4 loopback for `localhost`.
pub fn clean_env_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let unquoted = unquoted.strip_suffix('"').unwrap_or(unquoted);
    let cleaned = unquoted.trim().replace("localhost", "127.0.0.1");
    (!cleaned.is_empty()).then_some(cleaned)
}
