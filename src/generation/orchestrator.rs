//! Generation orchestrator: runs every endpoint of a document through prompt, model and
//! normalizer, isolating failures per endpoint.
//! Owns per-run execution and progress emission; transport and parsing stay in their domains.

use crate::error::GenerationError;
use crate::generation::result::{AggregateResult, EndpointOutcome};
use crate::normalize::normalize_for_endpoint;
use crate::progress::{
    new_run_id, EndpointEventData, GenerationCompletedData, GenerationFailedData,
    ProgressChannel, ProgressEvent, RunFinishedData, RunStartedData,
};
use crate::prompt::{PromptBuilder, DEFAULT_CASES_PER_ENDPOINT};
use crate::provider::ModelClient;
use crate::spec::{EndpointDescriptor, SpecDocument};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Knobs for one orchestrator. Defaults: sequential, no retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Maximum model calls in flight
    pub concurrency: usize,
    /// Extra attempts for network failures and timeouts
    pub max_retries: u32,
    /// Base backoff; attempt `n` waits `n * retry_delay_ms`
    pub retry_delay_ms: u64,
    pub cases_per_endpoint: usize,
    /// Use the streaming completion endpoint
    pub stream: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_retries: 0,
            retry_delay_ms: 1000,
            cases_per_endpoint: DEFAULT_CASES_PER_ENDPOINT,
            stream: false,
        }
    }
}

/// Shared cancellation signal. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State owned by a single run.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    cancellation: CancellationFlag,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_id(new_run_id())
    }

    pub fn with_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

pub struct GenerationOrchestrator {
    client: Arc<dyn ModelClient>,
    progress: Option<ProgressChannel>,
    settings: GenerationSettings,
    prompts: PromptBuilder,
}

impl GenerationOrchestrator {
    pub fn new(client: Arc<dyn ModelClient>, settings: GenerationSettings) -> Self {
        let prompts = PromptBuilder::new(settings.cases_per_endpoint);
        Self {
            client,
            progress: None,
            settings,
            prompts,
        }
    }

    pub fn with_progress(mut self, progress: ProgressChannel) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Run with a fresh context.
    pub async fn run(&self, spec: &Value) -> Result<AggregateResult, GenerationError> {
        self.run_with_context(spec, &RunContext::new()).await
    }

    /// Generate cases for every endpoint in `spec`.
    ///
    /// Only a non-object document (`Validation`) or a missing `paths` mapping (`Input`)
    /// fail the run. Everything else becomes a failure entry for its endpoint.
    pub async fn run_with_context(
        &self,
        spec: &Value,
        ctx: &RunContext,
    ) -> Result<AggregateResult, GenerationError> {
        let document = SpecDocument::from_value(spec.clone())?;
        let endpoints: Vec<EndpointDescriptor> = document.walker()?.endpoints().collect();
        let concurrency = self.settings.concurrency.max(1);
        let started = Instant::now();

        info!(
            run_id = %ctx.run_id(),
            endpoints = endpoints.len(),
            concurrency,
            model = %self.client.model_name(),
            "Generation run started"
        );
        self.emit(ProgressEvent::RunStarted(RunStartedData {
            run_id: ctx.run_id().to_string(),
            total_endpoints: endpoints.len(),
            title: document.info().title,
        }));

        let mut outcomes: Vec<Option<EndpointOutcome>> =
            std::iter::repeat_with(|| None).take(endpoints.len()).collect();
        let mut completions = stream::iter(endpoints.clone().into_iter().enumerate())
            .map(move |(index, endpoint)| async move {
                let outcome = self.process_endpoint(ctx, index, &endpoint).await;
                (index, outcome)
            })
            .buffer_unordered(concurrency);
        while let Some((index, outcome)) = completions.next().await {
            outcomes[index] = Some(outcome);
        }
        drop(completions);

        let cancelled = ctx.is_cancelled();
        let result = AggregateResult::assemble(
            ctx.run_id(),
            endpoints
                .into_iter()
                .zip(outcomes)
                .map(|(endpoint, outcome)| (endpoint, outcome.unwrap_or(EndpointOutcome::Skipped))),
            cancelled,
        );
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(
            run_id = %ctx.run_id(),
            cases = result.test_cases.len(),
            generated = result.generated_endpoints(),
            failed = result.failed_endpoints(),
            cancelled,
            duration_ms,
            "Generation run finished"
        );
        self.emit(ProgressEvent::RunFinished(RunFinishedData {
            run_id: ctx.run_id().to_string(),
            generated: result.generated_endpoints(),
            failed: result.failed_endpoints(),
            cancelled,
            duration_ms,
        }));
        Ok(result)
    }

    async fn process_endpoint(
        &self,
        ctx: &RunContext,
        index: usize,
        endpoint: &EndpointDescriptor,
    ) -> EndpointOutcome {
        let event_data = || EndpointEventData {
            run_id: ctx.run_id().to_string(),
            index,
            endpoint: endpoint.path.clone(),
            method: endpoint.method.as_upper().to_string(),
        };

        if ctx.is_cancelled() {
            debug!(run_id = %ctx.run_id(), endpoint = %endpoint.label(), "Skipping endpoint after cancellation");
            self.emit(ProgressEvent::GenerationSkipped(event_data()));
            return EndpointOutcome::Skipped;
        }

        self.emit(ProgressEvent::GenerationStarted(event_data()));
        let started = Instant::now();
        let prompt = self.prompts.build(endpoint.into());

        let outcome = match self.invoke(ctx, endpoint, &prompt).await {
            Ok(raw) => match normalize_for_endpoint(&raw, endpoint) {
                Ok((cases, _)) if cases.is_empty() => EndpointOutcome::Failed(
                    GenerationError::Format("Model returned no test cases".to_string()),
                ),
                Ok((cases, repaired)) => EndpointOutcome::Generated { cases, repaired },
                Err(err) => EndpointOutcome::Failed(err),
            },
            Err(err) => EndpointOutcome::Failed(err),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            EndpointOutcome::Generated { cases, repaired } => {
                info!(
                    run_id = %ctx.run_id(),
                    endpoint = %endpoint.label(),
                    count = cases.len(),
                    repaired = *repaired,
                    duration_ms,
                    "Generated test cases"
                );
                self.emit(ProgressEvent::GenerationCompleted(GenerationCompletedData {
                    run_id: ctx.run_id().to_string(),
                    index,
                    endpoint: endpoint.path.clone(),
                    method: endpoint.method.as_upper().to_string(),
                    count: cases.len(),
                    repaired: *repaired,
                    duration_ms,
                }));
            }
            EndpointOutcome::Failed(err) => {
                warn!(
                    run_id = %ctx.run_id(),
                    endpoint = %endpoint.label(),
                    kind = ?err.kind(),
                    error = %err,
                    duration_ms,
                    "Endpoint generation failed"
                );
                self.emit(ProgressEvent::GenerationFailed(GenerationFailedData {
                    run_id: ctx.run_id().to_string(),
                    index,
                    endpoint: endpoint.path.clone(),
                    method: endpoint.method.as_upper().to_string(),
                    reason: err.to_string(),
                    kind: err.kind(),
                }));
            }
            EndpointOutcome::Skipped => {}
        }
        outcome
    }

    /// One model call plus configured retries of transport failures.
    async fn invoke(
        &self,
        ctx: &RunContext,
        endpoint: &EndpointDescriptor,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        let mut attempt: u32 = 0;
        loop {
            match self.call_model(endpoint, prompt).await {
                Err(err) if err.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(
                        self.settings.retry_delay_ms.saturating_mul(u64::from(attempt)),
                    );
                    warn!(
                        run_id = %ctx.run_id(),
                        endpoint = %endpoint.label(),
                        attempt,
                        max_retries = self.settings.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Model call failed; retrying"
                    );
                    sleep(delay).await;
                    if ctx.is_cancelled() {
                        return Err(err);
                    }
                }
                other => return other,
            }
        }
    }

    async fn call_model(
        &self,
        endpoint: &EndpointDescriptor,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        if !self.settings.stream {
            return self.client.generate(prompt).await;
        }
        let mut chunks = 0usize;
        let mut on_chunk = |_: &str| chunks += 1;
        let text = self.client.generate_stream(prompt, &mut on_chunk).await?;
        debug!(endpoint = %endpoint.label(), chunks, chars = text.len(), "Stream finished");
        Ok(text)
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress.emit(event);
        }
    }
}
