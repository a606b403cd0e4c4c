//! Integration tests for the casegen pipeline

mod config_loading;
mod pipeline;
mod provider_http;
mod service_flow;
mod test_utils;
