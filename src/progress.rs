//! Progress observability primitives.
//!
//! The orchestrator and the service publish [`ProgressEvent`]s into a [`ProgressChannel`];
//! transports subscribe and forward the `{type, data}` envelopes to their peers.

pub mod channel;
pub mod event;

pub use channel::{ProgressChannel, SubscriberId, Subscription};
pub use event::{
    EndpointEventData, GenerationCompletedData, GenerationFailedData, ProgressEnvelope,
    ProgressEvent, RequestEventData, RunFinishedData, RunStartedData, UploadEventData,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Process-unique identifier for one generation run.
pub fn new_run_id() -> String {
    let ts = now_millis();
    let pid = std::process::id();
    let seq = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("run-{ts}-{pid}-{seq}")
}
