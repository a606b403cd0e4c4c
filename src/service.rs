//! Transport-agnostic message handling for real-time observers.
//!
//! A transport (websocket, socket.io bridge, stdin loop) feeds raw inbound text to
//! [`GenerationService::handle_message`], sends the returned [`ServiceReply`] back to the
//! peer, and forwards everything from [`GenerationService::subscribe`] to its observers.
//! At most one generation run is active at a time.

use crate::error::GenerationError;
use crate::generation::{AggregateResult, CancellationFlag, GenerationOrchestrator, RunContext};
use crate::progress::{
    ProgressChannel, ProgressEvent, RequestEventData, Subscription, UploadEventData,
};
use crate::spec::SpecDocument;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub const REQUEST_TYPE: &str = "api:request";
pub const CANCEL_TYPE: &str = "api:cancel";
pub const UPLOAD_STARTED_TYPE: &str = "fileUploadStarted";
pub const UPLOAD_CONFIRMED_TYPE: &str = "confirmUpload";

/// Direct answer to the peer that sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServiceReply {
    #[serde(rename = "status")]
    Status(String),
    #[serde(rename = "api:response")]
    Response(String),
    #[serde(rename = "api:status")]
    RequestStatus(String),
    #[serde(rename = "error")]
    Error(String),
}

impl ServiceReply {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    data: Value,
}

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Request(Value),
    Cancel,
    UploadStarted(String),
    UploadConfirmed(String),
}

impl InboundMessage {
    /// Parse raw text; failures come back as the error reply to send.
    pub fn parse(raw: &str) -> Result<Self, ServiceReply> {
        let message: RawMessage = serde_json::from_str(raw).map_err(|e| {
            error!(error = %e, "Invalid JSON received");
            ServiceReply::Error("Invalid JSON".to_string())
        })?;
        match message.message_type.as_str() {
            REQUEST_TYPE => Ok(InboundMessage::Request(message.data)),
            CANCEL_TYPE => Ok(InboundMessage::Cancel),
            UPLOAD_STARTED_TYPE => file_name(&message.data).map(InboundMessage::UploadStarted),
            UPLOAD_CONFIRMED_TYPE => file_name(&message.data).map(InboundMessage::UploadConfirmed),
            other => {
                warn!(message_type = other, "Unknown event type");
                Err(ServiceReply::Error(format!("Unknown event type: {}", other)))
            }
        }
    }
}

// Upload notifications carry either the bare file name or `{ "fileName": ... }`
fn file_name(data: &Value) -> Result<String, ServiceReply> {
    let name = match data {
        Value::String(name) => Some(name.as_str()),
        Value::Object(map) => map.get("fileName").and_then(Value::as_str),
        _ => None,
    };
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceReply::Error("Upload notification requires a file name".to_string()))
}

struct ActiveRun {
    run_id: String,
    cancellation: CancellationFlag,
}

#[derive(Default)]
struct ServiceState {
    active: Option<ActiveRun>,
    last_result: Option<AggregateResult>,
}

/// Clears the active slot when its run task ends, including by panic.
struct ActiveRunGuard {
    state: Arc<Mutex<ServiceState>>,
    run_id: String,
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state
            .active
            .as_ref()
            .is_some_and(|active| active.run_id == self.run_id)
        {
            state.active = None;
        }
    }
}

/// A spawned run. Dropping it detaches the run; it keeps going.
pub struct RunHandle {
    run_id: String,
    task: JoinHandle<Result<AggregateResult, GenerationError>>,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn wait(self) -> Result<AggregateResult, GenerationError> {
        self.task
            .await
            .map_err(|e| GenerationError::Model(format!("Generation task failed: {}", e)))?
    }
}

pub struct GenerationService {
    orchestrator: Arc<GenerationOrchestrator>,
    progress: ProgressChannel,
    state: Arc<Mutex<ServiceState>>,
}

impl GenerationService {
    pub fn new(orchestrator: GenerationOrchestrator, progress: ProgressChannel) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator.with_progress(progress.clone())),
            progress,
            state: Arc::new(Mutex::new(ServiceState::default())),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.progress.subscribe()
    }

    /// Greeting sent when a peer connects.
    pub fn connected_reply(&self) -> ServiceReply {
        ServiceReply::Status("Connected to generation service".to_string())
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Result of the most recently finished run.
    pub fn last_result(&self) -> Option<AggregateResult> {
        self.state.lock().last_result.clone()
    }

    pub fn handle_message(&self, raw: &str) -> ServiceReply {
        let message = match InboundMessage::parse(raw) {
            Ok(message) => message,
            Err(reply) => return reply,
        };
        match message {
            InboundMessage::Request(spec) => match self.start_run(spec) {
                Ok(handle) => {
                    ServiceReply::Response(format!("Generation started: {}", handle.run_id()))
                }
                Err(err) => ServiceReply::Error(err.to_string()),
            },
            InboundMessage::Cancel => match self.cancel() {
                Some(run_id) => ServiceReply::RequestStatus(format!("Request cancelled: {}", run_id)),
                None => ServiceReply::Error("No generation run is active".to_string()),
            },
            InboundMessage::UploadStarted(file_name) => {
                info!(file_name = %file_name, "Upload started");
                let reply = format!("Upload started for file: {}", file_name);
                self.progress
                    .emit(ProgressEvent::UploadStarted(UploadEventData { file_name }));
                ServiceReply::RequestStatus(reply)
            }
            InboundMessage::UploadConfirmed(file_name) => {
                info!(file_name = %file_name, "Upload confirmed");
                let reply = format!("File uploaded successfully: {}", file_name);
                self.progress
                    .emit(ProgressEvent::UploadConfirmed(UploadEventData { file_name }));
                ServiceReply::RequestStatus(reply)
            }
        }
    }

    /// Validate the document and spawn a run on the current tokio runtime.
    pub fn start_run(&self, spec: Value) -> Result<RunHandle, GenerationError> {
        let document = SpecDocument::from_value(spec)?;
        document.walker()?;

        let ctx = RunContext::new();
        {
            let mut state = self.state.lock();
            if let Some(active) = &state.active {
                return Err(GenerationError::Validation(format!(
                    "A generation run is already in progress ({})",
                    active.run_id
                )));
            }
            state.active = Some(ActiveRun {
                run_id: ctx.run_id().to_string(),
                cancellation: ctx.cancellation(),
            });
        }

        let run_id = ctx.run_id().to_string();
        info!(run_id = %run_id, "Generation request received");
        self.progress
            .emit(ProgressEvent::RequestReceived(RequestEventData {
                run_id: run_id.clone(),
            }));

        let orchestrator = Arc::clone(&self.orchestrator);
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let _active = ActiveRunGuard {
                state: Arc::clone(&state),
                run_id: ctx.run_id().to_string(),
            };
            let result = orchestrator.run_with_context(document.root(), &ctx).await;
            if let Ok(result) = &result {
                state.lock().last_result = Some(result.clone());
            }
            result
        });

        Ok(RunHandle { run_id, task })
    }

    /// Cancel the active run; returns its id.
    pub fn cancel(&self) -> Option<String> {
        let run_id = {
            let state = self.state.lock();
            let active = state.active.as_ref()?;
            active.cancellation.cancel();
            active.run_id.clone()
        };
        info!(run_id = %run_id, "Generation cancel requested");
        self.progress
            .emit(ProgressEvent::RequestCancelled(RequestEventData {
                run_id: run_id.clone(),
            }));
        Some(run_id)
    }
}
