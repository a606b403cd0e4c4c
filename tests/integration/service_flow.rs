//! Observer message flow through the generation service

use crate::integration::test_utils::{cases_json, ScriptedClient};
use casegen::generation::{GenerationOrchestrator, GenerationSettings};
use casegen::progress::ProgressChannel;
use casegen::service::{GenerationService, ServiceReply};
use serde_json::json;
use std::sync::Arc;

fn service() -> GenerationService {
    let client = Arc::new(
        ScriptedClient::new()
            .reply("/a", &cases_json("/a", "GET", 3))
            .reply("/b", &cases_json("/b", "POST", 2)),
    );
    GenerationService::new(
        GenerationOrchestrator::new(client, GenerationSettings::default()),
        ProgressChannel::new(),
    )
}

#[tokio::test]
async fn test_upload_then_request_streams_events_and_keeps_the_result() {
    let service = service();
    let mut observer = service.subscribe();

    let greeting = service.connected_reply();
    assert_eq!(
        greeting.to_json(),
        r#"{"type":"status","data":"Connected to generation service"}"#
    );

    let reply = service.handle_message(r#"{"type":"fileUploadStarted","data":"api.yaml"}"#);
    assert_eq!(
        reply,
        ServiceReply::RequestStatus("Upload started for file: api.yaml".to_string())
    );
    let reply =
        service.handle_message(r#"{"type":"confirmUpload","data":{"fileName":"api.yaml"}}"#);
    assert_eq!(
        reply,
        ServiceReply::RequestStatus("File uploaded successfully: api.yaml".to_string())
    );

    let spec = json!({"paths": {"/a": {"get": {}}, "/b": {"post": {}}}});
    let handle = service.start_run(spec).unwrap();
    let run_id = handle.run_id().to_string();
    let result = handle.wait().await.unwrap();

    assert_eq!(result.run_id, run_id);
    assert_eq!(result.test_cases.len(), 5);
    assert!(!service.is_busy());
    assert_eq!(service.last_result(), Some(result));

    let types: Vec<&'static str> = observer
        .drain()
        .iter()
        .map(|e| e.event.event_type())
        .collect();
    assert_eq!(
        types,
        vec![
            "uploadStarted",
            "uploadConfirmed",
            "requestReceived",
            "runStarted",
            "generationStarted",
            "generationCompleted",
            "generationStarted",
            "generationCompleted",
            "runFinished",
        ]
    );
}

#[tokio::test]
async fn test_request_message_starts_a_run() {
    let service = service();
    let reply = service.handle_message(
        &json!({"type": "api:request", "data": {"paths": {"/a": {"get": {}}}}}).to_string(),
    );
    match reply {
        ServiceReply::Response(text) => assert!(text.starts_with("Generation started: run-")),
        other => panic!("unexpected reply {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_messages_get_error_replies() {
    let service = service();

    assert_eq!(
        service.handle_message("{not json"),
        ServiceReply::Error("Invalid JSON".to_string())
    );
    assert_eq!(
        service.handle_message(r#"{"type":"api:explode"}"#),
        ServiceReply::Error("Unknown event type: api:explode".to_string())
    );
    assert_eq!(
        service.handle_message(r#"{"type":"api:cancel"}"#),
        ServiceReply::Error("No generation run is active".to_string())
    );
    match service.handle_message(r#"{"type":"api:request","data":{"openapi":"3.0.0"}}"#) {
        ServiceReply::Error(text) => assert!(text.starts_with("Input error")),
        other => panic!("unexpected reply {:?}", other),
    }
    assert!(!service.is_busy());
}

#[test]
fn test_replies_use_the_type_data_envelope() {
    let reply = ServiceReply::RequestStatus("Request cancelled: run-1".to_string());
    assert_eq!(
        reply.to_json(),
        r#"{"type":"api:status","data":"Request cancelled: run-1"}"#
    );
}
