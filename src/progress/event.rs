//! Event schema for progress observability.

use crate::error::FailureKind;
use serde::{Deserialize, Serialize};

/// Everything observers can be told about. Serialized as `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ProgressEvent {
    UploadStarted(UploadEventData),
    UploadConfirmed(UploadEventData),
    RequestReceived(RequestEventData),
    RequestCancelled(RequestEventData),
    RunStarted(RunStartedData),
    GenerationStarted(EndpointEventData),
    GenerationCompleted(GenerationCompletedData),
    GenerationFailed(GenerationFailedData),
    GenerationSkipped(EndpointEventData),
    RunFinished(RunFinishedData),
}

impl ProgressEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::UploadStarted(_) => "uploadStarted",
            ProgressEvent::UploadConfirmed(_) => "uploadConfirmed",
            ProgressEvent::RequestReceived(_) => "requestReceived",
            ProgressEvent::RequestCancelled(_) => "requestCancelled",
            ProgressEvent::RunStarted(_) => "runStarted",
            ProgressEvent::GenerationStarted(_) => "generationStarted",
            ProgressEvent::GenerationCompleted(_) => "generationCompleted",
            ProgressEvent::GenerationFailed(_) => "generationFailed",
            ProgressEvent::GenerationSkipped(_) => "generationSkipped",
            ProgressEvent::RunFinished(_) => "runFinished",
        }
    }

    /// Run this event belongs to, if any.
    pub fn run_id(&self) -> Option<&str> {
        match self {
            ProgressEvent::UploadStarted(_) | ProgressEvent::UploadConfirmed(_) => None,
            ProgressEvent::RequestReceived(d) | ProgressEvent::RequestCancelled(d) => {
                Some(&d.run_id)
            }
            ProgressEvent::RunStarted(d) => Some(&d.run_id),
            ProgressEvent::GenerationStarted(d) | ProgressEvent::GenerationSkipped(d) => {
                Some(&d.run_id)
            }
            ProgressEvent::GenerationCompleted(d) => Some(&d.run_id),
            ProgressEvent::GenerationFailed(d) => Some(&d.run_id),
            ProgressEvent::RunFinished(d) => Some(&d.run_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEventData {
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEventData {
    pub run_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStartedData {
    pub run_id: String,
    pub total_endpoints: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointEventData {
    pub run_id: String,
    pub index: usize,
    pub endpoint: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCompletedData {
    pub run_id: String,
    pub index: usize,
    pub endpoint: String,
    pub method: String,
    pub count: usize,
    pub repaired: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationFailedData {
    pub run_id: String,
    pub index: usize,
    pub endpoint: String,
    pub method: String,
    pub reason: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFinishedData {
    pub run_id: String,
    pub generated: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub duration_ms: u64,
}

/// An event as delivered to a subscriber: sequence number and RFC 3339 timestamp
/// assigned by the channel, event fields flattened alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEnvelope {
    pub seq: u64,
    pub ts: String,
    #[serde(flatten)]
    pub event: ProgressEvent,
}
