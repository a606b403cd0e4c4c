//! Casegen: API Test-Case Generation
//!
//! Walks an OpenAPI document, asks a locally hosted language model for test cases per
//! endpoint, repairs and normalizes the replies, and aggregates them while streaming
//! progress events to any observers.

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod normalize;
pub mod progress;
pub mod prompt;
pub mod provider;
pub mod service;
pub mod spec;
pub mod types;
