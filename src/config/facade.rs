//! Configuration loading facade.

use super::merge;
use super::sources::{environment, global_file, workspace_file};
use super::CasegenConfig;
use config::{ConfigError, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration for a workspace.
    pub fn load(workspace_root: &Path) -> Result<CasegenConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;
        let config: CasegenConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace = %workspace_root.display(),
            host = %config.model.host,
            model = %config.model.name,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single explicit file on top of the defaults, then environment overrides.
    pub fn load_from_file(path: &Path) -> Result<CasegenConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let builder = merge::builder_with_defaults()?
            .add_source(File::from(path).format(FileFormat::Toml).required(true));
        let builder = environment::add_to_builder(builder)?;
        builder.build()?.try_deserialize()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
