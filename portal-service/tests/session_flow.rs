//! End-to-end session lifecycle tests: authenticate, aggregate, ask,
//! reconfigure, end.

mod common;

use common::{ask, create_session, seeded_drive, spawn_app};
use portal_service::services::drive::mock::MockDrive;
use portal_service::services::providers::mock::MockTextProvider;
use reqwest::Client;
use std::sync::Arc;

#[tokio::test]
async fn create_session_aggregates_documents_once() {
    let drive = seeded_drive();
    let port = spawn_app(drive.clone(), Arc::new(MockTextProvider::new(true))).await;
    let client = Client::new();

    let response = create_session(&client, port, "acme").await;
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    // Two readable files plus one placeholder section.
    assert_eq!(body["file_count"], 3);
    assert!(body["context_chars"].as_u64().unwrap() > 0);
    assert_eq!(body["tenant_id"], "acme");

    // Further questions never re-aggregate.
    let calls_after_create = drive.call_count();
    let session_id = body["session_id"].as_str().unwrap();
    let response = ask(&client, port, session_id, "How many participants mentioned pricing?").await;
    assert!(response.status().is_success());
    assert_eq!(drive.call_count(), calls_after_create);
}

#[tokio::test]
async fn unknown_tenant_is_rejected_before_any_drive_call() {
    let drive = Arc::new(MockDrive::new());
    let port = spawn_app(drive.clone(), Arc::new(MockTextProvider::new(true))).await;
    let client = Client::new();

    let response = create_session(&client, port, "intruder").await;
    assert_eq!(response.status().as_u16(), 401);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid Access ID"));
    assert_eq!(drive.call_count(), 0);
}

#[tokio::test]
async fn ask_answers_and_records_the_turns() {
    let port = spawn_app(seeded_drive(), Arc::new(MockTextProvider::new(true))).await;
    let client = Client::new();

    let body: serde_json::Value = create_session(&client, port, "acme").await.json().await.unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let response = ask(&client, port, &session_id, "How many participants mentioned pricing?").await;
    assert!(response.status().is_success());

    let answer: serde_json::Value = response.json().await.unwrap();
    // The mock provider echoes the final prompt line, i.e. the question.
    assert_eq!(
        answer["answer"],
        "Mock response for: How many participants mentioned pricing?"
    );
    assert!(answer.get("error_kind").is_none());
    assert!(answer["usage"]["input_tokens"].as_i64().unwrap() > 0);
    assert_eq!(answer["quota"]["count"], 1);
    assert_eq!(answer["quota"]["limit"], 300);
    assert_eq!(answer["quota"]["period"], "day");

    let session: serde_json::Value = client
        .get(format!("http://localhost:{}/sessions/{}", port, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = session["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(session["query_count"], 1);
}

#[tokio::test]
async fn settings_are_validated_and_applied() {
    let port = spawn_app(seeded_drive(), Arc::new(MockTextProvider::new(true))).await;
    let client = Client::new();

    let body: serde_json::Value = create_session(&client, port, "acme").await.json().await.unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_string();

    // Out-of-range temperature is rejected.
    let response = client
        .put(format!(
            "http://localhost:{}/sessions/{}/settings",
            port, session_id
        ))
        .json(&serde_json::json!({ "temperature": 2.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    // Valid settings stick.
    let response = client
        .put(format!(
            "http://localhost:{}/sessions/{}/settings",
            port, session_id
        ))
        .json(&serde_json::json!({
            "temperature": 0.7,
            "custom_persona": "Focus on pricing feedback."
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let session: serde_json::Value = response.json().await.unwrap();
    assert!((session["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(session["custom_persona"], "Focus on pricing feedback.");
}

#[tokio::test]
async fn provider_failure_degrades_to_an_error_answer() {
    let port = spawn_app(seeded_drive(), Arc::new(MockTextProvider::failing())).await;
    let client = Client::new();

    let body: serde_json::Value = create_session(&client, port, "acme").await.json().await.unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let response = ask(&client, port, &session_id, "How many?").await;
    // Degraded, not a server error.
    assert!(response.status().is_success());

    let answer: serde_json::Value = response.json().await.unwrap();
    assert!(answer["answer"]
        .as_str()
        .unwrap()
        .starts_with("[Error generating response:"));
    assert_eq!(answer["error_kind"], "api_error");

    // The degraded turn is still recorded in the conversation.
    let session: serde_json::Value = client
        .get(format!("http://localhost:{}/sessions/{}", port, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = session["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[1]["content"]
        .as_str()
        .unwrap()
        .contains("[Error generating response:"));
}

#[tokio::test]
async fn delete_ends_the_session() {
    let port = spawn_app(seeded_drive(), Arc::new(MockTextProvider::new(true))).await;
    let client = Client::new();

    let body: serde_json::Value = create_session(&client, port, "acme").await.json().await.unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let response = client
        .delete(format!("http://localhost:{}/sessions/{}", port, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("http://localhost:{}/sessions/{}", port, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = ask(&client, port, &session_id, "still there?").await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn question_is_validated() {
    let port = spawn_app(seeded_drive(), Arc::new(MockTextProvider::new(true))).await;
    let client = Client::new();

    let body: serde_json::Value = create_session(&client, port, "acme").await.json().await.unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let response = ask(&client, port, &session_id, "").await;
    assert_eq!(response.status().as_u16(), 422);
}
