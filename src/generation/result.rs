//! Run results: per-endpoint outcomes and the aggregate handed back to callers.

use crate::error::{FailureKind, GenerationError};
use crate::spec::EndpointDescriptor;
use crate::types::{TestCase, TestCategory};
use serde::{Deserialize, Serialize};

/// What happened to one endpoint.
#[derive(Debug)]
pub enum EndpointOutcome {
    Generated { cases: Vec<TestCase>, repaired: bool },
    Failed(GenerationError),
    /// Never issued because the run was cancelled first.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointFailure {
    pub endpoint: String,
    pub method: String,
    pub reason: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Generated,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub method: String,
    pub path: String,
    pub status: EndpointStatus,
    pub case_count: usize,
    pub repaired: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub valid: usize,
    pub edge: usize,
    pub invalid: usize,
}

/// Cases in declaration order plus one failure entry per endpoint that produced nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub run_id: String,
    pub test_cases: Vec<TestCase>,
    pub failures: Vec<EndpointFailure>,
    pub endpoints: Vec<EndpointSummary>,
    pub cancelled: bool,
}

impl AggregateResult {
    /// Fold outcomes, already in declaration order, into the aggregate.
    pub fn assemble<I>(run_id: impl Into<String>, outcomes: I, cancelled: bool) -> Self
    where
        I: IntoIterator<Item = (EndpointDescriptor, EndpointOutcome)>,
    {
        let mut result = AggregateResult {
            run_id: run_id.into(),
            test_cases: Vec::new(),
            failures: Vec::new(),
            endpoints: Vec::new(),
            cancelled,
        };

        for (endpoint, outcome) in outcomes {
            let method = endpoint.method.as_upper().to_string();
            let summary = match outcome {
                EndpointOutcome::Generated { cases, repaired } => {
                    let summary = EndpointSummary {
                        method,
                        path: endpoint.path,
                        status: EndpointStatus::Generated,
                        case_count: cases.len(),
                        repaired,
                    };
                    result.test_cases.extend(cases);
                    summary
                }
                EndpointOutcome::Failed(err) => {
                    result.failures.push(EndpointFailure {
                        endpoint: endpoint.path.clone(),
                        method: method.clone(),
                        reason: err.to_string(),
                        kind: err.kind(),
                    });
                    EndpointSummary {
                        method,
                        path: endpoint.path,
                        status: EndpointStatus::Failed,
                        case_count: 0,
                        repaired: false,
                    }
                }
                EndpointOutcome::Skipped => EndpointSummary {
                    method,
                    path: endpoint.path,
                    status: EndpointStatus::Skipped,
                    case_count: 0,
                    repaired: false,
                },
            };
            result.endpoints.push(summary);
        }
        result
    }

    pub fn generated_endpoints(&self) -> usize {
        self.count_status(EndpointStatus::Generated)
    }

    pub fn failed_endpoints(&self) -> usize {
        self.failures.len()
    }

    pub fn skipped_endpoints(&self) -> usize {
        self.count_status(EndpointStatus::Skipped)
    }

    pub fn category_counts(&self) -> CategoryCounts {
        self.test_cases
            .iter()
            .fold(CategoryCounts::default(), |mut counts, case| {
                match case.category {
                    TestCategory::Valid => counts.valid += 1,
                    TestCategory::Edge => counts.edge += 1,
                    TestCategory::Invalid => counts.invalid += 1,
                }
                counts
            })
    }

    fn count_status(&self, status: EndpointStatus) -> usize {
        self.endpoints.iter().filter(|e| e.status == status).count()
    }
}
