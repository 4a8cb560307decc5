//! Integration tests for the chat route.
//!
//! Uses axum-test for the route and wiremock for the upstream provider.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use batcomputer_relay::{router, ChatResponse, ErrorResponse, Relay, RelayConfig};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn relay_with(vars: &[(&str, String)]) -> Arc<Relay> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Arc::new(Relay::new(RelayConfig::from_lookup(|name| vars.get(name).cloned())))
}

fn server_for(relay: Arc<Relay>) -> TestServer {
    TestServer::new(router(relay)).unwrap()
}

fn conversation() -> serde_json::Value {
    json!({"messages": [{"role": "user", "content": "Where is the Joker?"}]})
}

// =============================================================================
// CHAT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_unconfigured_relay_is_bad_request() {
    let server = server_for(relay_with(&[]));

    let response = server.post("/api/chat").json(&conversation()).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(
        body.error,
        "AI not configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY."
    );
}

#[tokio::test]
async fn test_openai_reply_is_returned() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Arkham Asylum, cell 4."}}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = server_for(relay_with(&[
        ("OPENAI_API_KEY", "sk-o".to_string()),
        ("OPENAI_BASE_URL", upstream.uri()),
        ("ANTHROPIC_API_KEY", "sk-a".to_string()),
    ]));

    let response = server.post("/api/chat").json(&conversation()).await;

    response.assert_status_ok();
    let body: ChatResponse = response.json();
    assert_eq!(body.reply, "Arkham Asylum, cell 4.");
}

#[tokio::test]
async fn test_anthropic_used_without_openai_key() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Unknown."}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = server_for(relay_with(&[
        ("ANTHROPIC_API_KEY", "sk-a".to_string()),
        ("ANTHROPIC_BASE_URL", upstream.uri()),
    ]));

    let response = server.post("/api/chat").json(&conversation()).await;

    response.assert_status_ok();
    assert_eq!(response.json::<ChatResponse>().reply, "Unknown.");
}

#[tokio::test]
async fn test_upstream_failure_is_server_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model overloaded"))
        .mount(&upstream)
        .await;

    let server = server_for(relay_with(&[
        ("OPENAI_API_KEY", "sk-o".to_string()),
        ("OPENAI_BASE_URL", upstream.uri()),
    ]));

    let response = server.post("/api/chat").json(&conversation()).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<ErrorResponse>().error, "model overloaded");
}

#[tokio::test]
async fn test_missing_messages_defaults_to_empty() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&upstream)
        .await;

    let server = server_for(relay_with(&[
        ("OPENAI_API_KEY", "sk-o".to_string()),
        ("OPENAI_BASE_URL", upstream.uri()),
    ]));

    let response = server.post("/api/chat").json(&json!({})).await;

    response.assert_status_ok();
    assert_eq!(response.json::<ChatResponse>().reply, "");
}
