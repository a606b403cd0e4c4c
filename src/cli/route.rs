//! CLI route: single route table and command context. Dispatches to the pipeline and presentation.

use crate::cli::help::command_name;
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_model_list_json, format_model_list_table, format_progress_line, format_result_json,
    format_result_table,
};
use crate::config::{CasegenConfig, ConfigLoader};
use crate::error::GenerationError;
use crate::generation::{GenerationOrchestrator, RunContext};
use crate::progress::ProgressChannel;
use crate::spec::{load_document, SpecDocument};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Per-invocation overrides for `generate`, folded over the loaded config.
#[derive(Debug, Default, Clone)]
pub struct GenerateOverrides {
    pub concurrency: Option<usize>,
    pub model: Option<String>,
    pub host: Option<String>,
    pub cases: Option<usize>,
    pub retries: Option<u32>,
    pub stream: bool,
}

impl GenerateOverrides {
    pub fn apply(&self, config: &mut CasegenConfig) {
        if let Some(concurrency) = self.concurrency {
            config.generation.concurrency = concurrency;
        }
        if let Some(ref model) = self.model {
            config.model.name = model.clone();
        }
        if let Some(ref host) = self.host {
            config.model.host = host.clone();
        }
        if let Some(cases) = self.cases {
            config.generation.cases_per_endpoint = cases;
        }
        if let Some(retries) = self.retries {
            config.generation.max_retries = retries;
        }
        if self.stream {
            config.generation.stream = true;
        }
    }
}

/// Runtime context for CLI execution: workspace and effective configuration.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct CommandContext {
    workspace_root: PathBuf,
    config: CasegenConfig,
    color: bool,
}

impl CommandContext {
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, GenerationError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: CasegenConfig) -> Self {
        let color = config.logging.color;
        Self {
            workspace_root,
            config,
            color,
        }
    }

    pub fn config(&self) -> &CasegenConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, GenerationError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(command = name, "Command started");

        let result = match command {
            Commands::Generate {
                spec,
                output,
                format,
                concurrency,
                model,
                host,
                cases,
                retries,
                stream,
                no_progress,
            } => {
                let overrides = GenerateOverrides {
                    concurrency: *concurrency,
                    model: model.clone(),
                    host: host.clone(),
                    cases: *cases,
                    retries: *retries,
                    stream: *stream,
                };
                self.generate(spec, &overrides, *format, output.as_deref(), !*no_progress)
                    .await
            }
            Commands::Models { format } => self.models(*format).await,
            Commands::Pull { model } => self.pull(model.as_deref()).await,
            Commands::Config { check } => self.show_config(*check),
        };

        match &result {
            Ok(_) => info!(
                command = name,
                duration_ms = started.elapsed().as_millis() as u64,
                "Command completed"
            ),
            Err(e) => warn!(command = name, error = %e, "Command failed"),
        }
        result
    }

    async fn generate(
        &self,
        spec_path: &Path,
        overrides: &GenerateOverrides,
        format: OutputFormat,
        output: Option<&Path>,
        show_progress: bool,
    ) -> Result<String, GenerationError> {
        let document = SpecDocument::from_value(load_document(spec_path)?)?;

        let mut config = self.config.clone();
        overrides.apply(&mut config);
        config.ensure_valid()?;

        let client = Arc::new(config.model.build_client()?);
        let progress = ProgressChannel::with_history(config.generation.history_capacity);
        let orchestrator = GenerationOrchestrator::new(client, config.generation.settings())
            .with_progress(progress.clone());

        let renderer = show_progress.then(|| {
            let mut subscription = progress.subscribe();
            let color = self.color;
            tokio::spawn(async move {
                while let Some(envelope) = subscription.recv().await {
                    if let Some(line) = format_progress_line(&envelope, color) {
                        eprintln!("{}", line);
                    }
                }
            })
        });

        let ctx = RunContext::new();
        let cancellation = ctx.cancellation();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing in-flight requests");
                cancellation.cancel();
            }
        });

        let outcome = orchestrator.run_with_context(document.root(), &ctx).await;
        interrupt.abort();

        // Dropping every channel handle closes the subscription so the renderer drains and exits.
        drop(orchestrator);
        drop(progress);
        if let Some(renderer) = renderer {
            let _ = renderer.await;
        }

        let result = outcome?;
        let rendered = match format {
            OutputFormat::Json => format_result_json(&result)?,
            OutputFormat::Table => format_result_table(&result),
        };

        match output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        GenerationError::Input(format!(
                            "Failed to create {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
                std::fs::write(path, &rendered).map_err(|e| {
                    GenerationError::Input(format!("Failed to write {}: {}", path.display(), e))
                })?;
                Ok(format!(
                    "Wrote {} test case(s) to {}",
                    result.test_cases.len(),
                    path.display()
                ))
            }
            None => Ok(rendered),
        }
    }

    async fn models(&self, format: OutputFormat) -> Result<String, GenerationError> {
        let client = self.config.model.build_client()?;
        let models = client.check_connection().await?;
        match format {
            OutputFormat::Json => format_model_list_json(&models),
            OutputFormat::Table => Ok(format_model_list_table(&models, &self.config.model.name)),
        }
    }

    async fn pull(&self, model: Option<&str>) -> Result<String, GenerationError> {
        let mut model_config = self.config.model.clone();
        if let Some(model) = model {
            model_config.name = model.to_string();
        }
        let client = model_config.build_client()?;
        client.pull_model().await?;
        Ok(format!("Pulled model '{}'", model_config.name))
    }

    fn show_config(&self, check: bool) -> Result<String, GenerationError> {
        self.config.ensure_valid()?;
        if check {
            return Ok("Configuration is valid".to_string());
        }
        self.config.to_toml()
    }
}
