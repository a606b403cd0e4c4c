pub mod orchestrator;
pub mod result;

pub use orchestrator::{CancellationFlag, GenerationOrchestrator, GenerationSettings, RunContext};
pub use result::{
    AggregateResult, CategoryCounts, EndpointFailure, EndpointOutcome, EndpointStatus,
    EndpointSummary,
};
