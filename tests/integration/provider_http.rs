//! OllamaClient against a loopback model service

use crate::integration::test_utils::{cases_json, completion, FakeModelService, Reply};
use casegen::error::{FailureKind, GenerationError};
use casegen::generation::{GenerationOrchestrator, GenerationSettings};
use casegen::provider::{GenerationOptions, ModelClient, OllamaClient};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn client(base_url: &str, timeout: Duration) -> OllamaClient {
    OllamaClient::new("phi3".to_string(), Some(base_url.to_string()), Some(timeout)).unwrap()
}

#[tokio::test]
async fn test_generate_sends_model_prompt_and_options() {
    let service = FakeModelService::start(|_| completion("[]")).await;
    let client = client(&service.base_url, Duration::from_secs(5)).with_options(GenerationOptions {
        temperature: Some(0.2),
        ..GenerationOptions::default()
    });

    let text = client.generate("hello").await.unwrap();
    assert_eq!(text, "[]");

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/generate");
    let body: Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["model"], "phi3");
    assert_eq!(body["prompt"], "hello");
    assert_eq!(body["stream"], false);
    assert_eq!(body["options"]["num_predict"], 1000);
    assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn test_non_success_status_is_a_model_error() {
    let service =
        FakeModelService::start(|_| Reply::raw(404, r#"{"error":"model 'phi3' not found"}"#)).await;
    let err = client(&service.base_url, Duration::from_secs(5))
        .generate("hello")
        .await
        .unwrap_err();
    match err {
        GenerationError::Model(msg) => {
            assert!(msg.contains("404"));
            assert!(msg.contains("not found"));
        }
        other => panic!("expected model error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_envelope_and_missing_text_are_model_errors() {
    let service = FakeModelService::start(|request| {
        if request.body.contains("\"prompt\":\"boom\"") {
            Reply::json(json!({"error": "out of memory"}))
        } else {
            Reply::json(json!({"model": "phi3", "done": true}))
        }
    })
    .await;
    let client = client(&service.base_url, Duration::from_secs(5));

    assert!(matches!(
        client.generate("boom").await,
        Err(GenerationError::Model(msg)) if msg == "out of memory"
    ));
    assert!(matches!(
        client.generate("quiet").await,
        Err(GenerationError::Model(_))
    ));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let service =
        FakeModelService::start(|_| completion("[]").delayed(Duration::from_secs(3))).await;
    let err = client(&service.base_url, Duration::from_millis(300))
        .generate("hello")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Timeout(d) if d == Duration::from_millis(300)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_refused_connection_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr), Duration::from_secs(2))
        .generate("hello")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Network);
}

#[tokio::test]
async fn test_streaming_concatenates_fragments() {
    let service = FakeModelService::start(|_| {
        Reply::raw(
            200,
            "{\"response\":\"[{\\\"name\\\":\"}\n\
             \n\
             not json\n\
             {\"response\":\"\\\"A\\\"}]\"}\n\
             {\"response\":\"\",\"done\":true}",
        )
    })
    .await;
    let client = client(&service.base_url, Duration::from_secs(5));

    let mut chunks = Vec::new();
    let text = client
        .generate_stream("hello", &mut |chunk| chunks.push(chunk.to_string()))
        .await
        .unwrap();

    assert_eq!(text, r#"[{"name":"A"}]"#);
    assert_eq!(chunks, vec![r#"[{"name":"#.to_string(), r#""A"}]"#.to_string()]);
    let body: Value = serde_json::from_str(&service.requests()[0].body).unwrap();
    assert_eq!(body["stream"], true);
}

#[tokio::test]
async fn test_check_connection_lists_models_and_pull_posts() {
    let service = FakeModelService::start(|request| match request.path.as_str() {
        "/api/tags" => Reply::json(json!({
            "models": [
                {"name": "phi3:latest", "size": 2176178913u64, "modified_at": "2024-05-01T10:00:00Z"},
                {"name": "llama3:8b"}
            ]
        })),
        "/api/pull" => Reply::json(json!({"status": "success"})),
        _ => Reply::raw(404, "not found"),
    })
    .await;
    let client = client(&service.base_url, Duration::from_secs(5));

    let models = client.check_connection().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "phi3:latest");
    assert_eq!(models[0].size, Some(2176178913));
    assert_eq!(models[1].size, None);

    client.pull_model().await.unwrap();
    let requests = service.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[1].path, "/api/pull");
    let body: Value = serde_json::from_str(&requests[1].body).unwrap();
    assert_eq!(body["name"], "phi3");
}

#[tokio::test]
async fn test_pipeline_over_http_isolates_a_failing_endpoint() {
    let service = FakeModelService::start(|request| {
        if request.body.contains("Path: /orders") {
            Reply::raw(500, "internal error")
        } else {
            completion(&cases_json("/users", "GET", 3))
        }
    })
    .await;
    let client = Arc::new(client(&service.base_url, Duration::from_secs(5)));
    let orchestrator = GenerationOrchestrator::new(
        client,
        GenerationSettings {
            concurrency: 2,
            ..GenerationSettings::default()
        },
    );
    let spec = json!({"paths": {"/users": {"get": {}}, "/orders": {"get": {}}}});

    let result = orchestrator.run(&spec).await.unwrap();

    assert_eq!(result.test_cases.len(), 3);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].endpoint, "/orders");
    assert_eq!(result.failures[0].kind, FailureKind::Model);
    assert_eq!(service.requests().len(), 2);
}
