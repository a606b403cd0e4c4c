//! End-to-end orchestration against a scripted model client

use crate::integration::test_utils::{cases_json, ScriptedClient};
use casegen::error::{FailureKind, GenerationError};
use casegen::generation::{EndpointStatus, GenerationOrchestrator, GenerationSettings};
use casegen::progress::{ProgressChannel, ProgressEvent};
use casegen::spec::{parse_document, DocumentFormat};
use casegen::types::TestCategory;
use serde_json::json;
use std::sync::Arc;

fn orchestrator(client: Arc<ScriptedClient>, concurrency: usize) -> GenerationOrchestrator {
    GenerationOrchestrator::new(
        client,
        GenerationSettings {
            concurrency,
            ..GenerationSettings::default()
        },
    )
}

#[tokio::test]
async fn test_one_failing_endpoint_does_not_abort_the_run() {
    let client = Arc::new(
        ScriptedClient::new()
            .reply("/a", &cases_json("/a", "GET", 3))
            .fail("/b", || GenerationError::Network("connection refused".to_string())),
    );
    let spec = json!({
        "openapi": "3.0.0",
        "paths": {
            "/a": {"get": {"summary": "List A"}},
            "/b": {"get": {"summary": "List B"}}
        }
    });

    let result = orchestrator(Arc::clone(&client), 1).run(&spec).await.unwrap();

    assert_eq!(result.test_cases.len(), 3);
    assert!(result.test_cases.iter().all(|c| c.endpoint == "/a"));
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].endpoint, "/b");
    assert_eq!(result.failures[0].method, "GET");
    assert_eq!(result.failures[0].kind, FailureKind::Network);
    assert!(!result.cancelled);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_yaml_document_in_declaration_order_under_concurrency() {
    let yaml = r#"
openapi: 3.0.0
info:
  title: Pets
  version: "1.0"
paths:
  /pets:
    get:
      summary: List pets
    post:
      summary: Create pet
  /pets/{id}:
    delete:
      summary: Remove pet
"#;
    let spec = parse_document(yaml, DocumentFormat::Yaml).unwrap();
    let client = Arc::new(
        ScriptedClient::new()
            .reply("/pets", &cases_json("/pets", "GET", 2))
            .reply("/pets/{id}", &cases_json("/pets/{id}", "DELETE", 1)),
    );

    let result = orchestrator(client, 4).run(&spec).await.unwrap();

    let order: Vec<(String, String)> = result
        .endpoints
        .iter()
        .map(|e| (e.method.clone(), e.path.clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("GET".to_string(), "/pets".to_string()),
            ("POST".to_string(), "/pets".to_string()),
            ("DELETE".to_string(), "/pets/{id}".to_string()),
        ]
    );
    assert_eq!(result.test_cases.len(), 5);
    assert_eq!(result.test_cases[4].endpoint, "/pets/{id}");
    assert!(result
        .endpoints
        .iter()
        .all(|e| e.status == EndpointStatus::Generated));
}

#[tokio::test]
async fn test_sloppy_model_output_is_repaired() {
    let sloppy = "Here are your tests:\n```json\n[{'name': 'A', category: 'valid', \
                  'expected_response_code': 200,},]\n```";
    let client = Arc::new(ScriptedClient::new().reply("/a", sloppy));
    let spec = json!({"paths": {"/a": {"post": {}}}});

    let result = orchestrator(client, 1).run(&spec).await.unwrap();

    assert_eq!(result.test_cases.len(), 1);
    let case = &result.test_cases[0];
    assert_eq!(case.name, "A");
    assert_eq!(case.category, TestCategory::Valid);
    assert_eq!(case.method, "POST");
    assert_eq!(case.endpoint, "/a");
    assert!(result.endpoints[0].repaired);
}

#[tokio::test]
async fn test_unrepairable_output_becomes_a_failure_entry() {
    let client = Arc::new(ScriptedClient::new().reply("/a", "I cannot help with that."));
    let spec = json!({"paths": {"/a": {"get": {}}}});

    let result = orchestrator(client, 1).run(&spec).await.unwrap();

    assert!(result.test_cases.is_empty());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, FailureKind::Repair);
}

#[tokio::test]
async fn test_empty_paths_produce_an_empty_result() {
    let client = Arc::new(ScriptedClient::new());
    let spec = json!({"paths": {}});

    let result = orchestrator(Arc::clone(&client), 1).run(&spec).await.unwrap();

    assert!(result.test_cases.is_empty());
    assert!(result.failures.is_empty());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_structural_errors_abort_before_any_model_call() {
    let client = Arc::new(ScriptedClient::new());
    let orchestrator = orchestrator(Arc::clone(&client), 1);

    let missing = orchestrator.run(&json!({"openapi": "3.0.0"})).await;
    assert!(matches!(missing, Err(GenerationError::Input(_))));

    let not_object = orchestrator.run(&json!(["paths"])).await;
    assert!(matches!(not_object, Err(GenerationError::Validation(_))));

    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_malformed_operations_are_still_generated() {
    let client = Arc::new(
        ScriptedClient::new()
            .reply("/a", &cases_json("/a", "GET", 1))
            .reply("/b", &cases_json("/b", "GET", 1))
            .reply("/c", &cases_json("/c", "POST", 1)),
    );
    let spec = json!({
        "paths": {
            "/a": {"get": {"summary": "Fine"}},
            "/b": {"get": {"summary": 7, "parameters": {"id": {"in": "path"}}}},
            "/c": {"post": null}
        }
    });

    let result = orchestrator(Arc::clone(&client), 1).run(&spec).await.unwrap();

    let paths: Vec<&str> = result.endpoints.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/a", "/b", "/c"]);
    assert!(result
        .endpoints
        .iter()
        .all(|e| e.status == EndpointStatus::Generated));
    assert_eq!(result.test_cases.len(), 3);
    assert_eq!(client.calls(), 3);
    assert!(client.prompts()[1].contains("Summary: N/A"));
}

#[tokio::test]
async fn test_progress_events_bracket_the_run() {
    let client = Arc::new(
        ScriptedClient::new()
            .reply("/a", &cases_json("/a", "GET", 3))
            .fail("/b", || GenerationError::Format("Model returned no test cases".to_string())),
    );
    let progress = ProgressChannel::new();
    let mut subscription = progress.subscribe();
    let orchestrator = orchestrator(client, 1).with_progress(progress.clone());
    let spec = json!({"info": {"title": "Demo"}, "paths": {"/a": {"get": {}}, "/b": {"get": {}}}});

    orchestrator.run(&spec).await.unwrap();

    let events = subscription.drain();
    let types: Vec<&str> = events.iter().map(|e| e.event.event_type()).collect();
    assert_eq!(
        types,
        vec![
            "runStarted",
            "generationStarted",
            "generationCompleted",
            "generationStarted",
            "generationFailed",
            "runFinished",
        ]
    );
    assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
    match &events[0].event {
        ProgressEvent::RunStarted(data) => {
            assert_eq!(data.title.as_deref(), Some("Demo"));
            assert_eq!(data.total_endpoints, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &events[2].event {
        ProgressEvent::GenerationCompleted(data) => {
            assert_eq!(data.endpoint, "/a");
            assert_eq!(data.count, 3);
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &events[5].event {
        ProgressEvent::RunFinished(data) => {
            assert_eq!(data.generated, 1);
            assert_eq!(data.failed, 1);
            assert!(!data.cancelled);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_prompts_carry_the_operation_context() {
    let client = Arc::new(ScriptedClient::new().reply("/users", &cases_json("/users", "POST", 1)));
    let spec = json!({
        "paths": {
            "/users": {
                "post": {
                    "summary": "Create user",
                    "requestBody": {"content": {"application/json": {"schema": {"type": "object"}}}}
                }
            }
        }
    });

    orchestrator(Arc::clone(&client), 1).run(&spec).await.unwrap();

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Method: POST"));
    assert!(prompts[0].contains("Summary: Create user"));
    assert!(prompts[0].contains("application/json"));
}
