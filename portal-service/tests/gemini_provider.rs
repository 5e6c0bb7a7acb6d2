//! HTTP contract tests for the Gemini provider against a local mock server.

use portal_service::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use portal_service::services::providers::{GenerationParams, ProviderError, TextProvider};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> GeminiTextProvider {
    GeminiTextProvider::new(GeminiConfig {
        api_key: "test-key".to_string(),
        model: "gemini-2.5-flash".to_string(),
        api_base: server.uri(),
    })
}

fn params() -> GenerationParams {
    GenerationParams {
        temperature: Some(0.2),
    }
}

#[tokio::test]
async fn generate_parses_a_successful_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "generationConfig": { "temperature": 0.2 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Seven participants." }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 1200, "candidatesTokenCount": 8 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider_for(&server)
        .generate("How many participants mentioned pricing?", &params())
        .await
        .expect("generate should succeed");

    assert_eq!(response.text.as_deref(), Some("Seven participants."));
    assert_eq!(response.input_tokens, 1200);
    assert_eq!(response.output_tokens, 8);
}

#[tokio::test]
async fn http_429_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate("q", &params())
        .await
        .expect_err("generate should fail");
    assert!(matches!(err, ProviderError::RateLimited));
    assert_eq!(err.kind(), "rate_limited");
}

#[tokio::test]
async fn safety_block_maps_to_content_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [] },
                "finishReason": "SAFETY"
            }]
        })))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate("q", &params())
        .await
        .expect_err("generate should fail");
    assert!(matches!(err, ProviderError::ContentFiltered));
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .generate("q", &params())
        .await
        .expect_err("generate should fail");
    assert!(matches!(err, ProviderError::ApiError(_)));
}

#[tokio::test]
async fn health_check_lists_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": [] })))
        .mount(&server)
        .await;

    provider_for(&server)
        .health_check()
        .await
        .expect("health check should pass");
}

#[tokio::test]
async fn health_check_requires_an_api_key() {
    let server = MockServer::start().await;
    let provider = GeminiTextProvider::new(GeminiConfig {
        api_key: String::new(),
        model: "gemini-2.5-flash".to_string(),
        api_base: server.uri(),
    });

    let err = provider.health_check().await.expect_err("should fail");
    assert!(matches!(err, ProviderError::NotConfigured(_)));
}
