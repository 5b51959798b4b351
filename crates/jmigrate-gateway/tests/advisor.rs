//! Integration tests for GeminiAdvisor using wiremock

use std::time::Duration;

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jmigrate_gateway::{Advisor, AdvisoryContext, GatewayError, GeminiAdvisor, TransportPolicy};

fn create_advisor(mock_server: &MockServer) -> GeminiAdvisor {
    GeminiAdvisor::with_base_url(
        "test-api-key",
        "test-model",
        mock_server.uri(),
        TransportPolicy::no_retry(Duration::from_secs(5)),
    )
    .unwrap()
}

fn compile_context() -> AdvisoryContext {
    AdvisoryContext::new(
        "Project Compilation",
        serde_json::json!({"success": false, "errors": ["cannot find symbol"]}),
    )
    .with_previous(Some("Java 11 project with 3 dependencies".to_string()))
}

#[tokio::test]
async fn test_gemini_advisor_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{"role": "user"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "1. The build fails on a missing symbol. " },
                        { "text": "2. Fix imports before migrating." }
                    ]
                },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let advisor = create_advisor(&mock_server);
    let text = advisor.advise(&compile_context()).await.unwrap();

    assert_eq!(
        text,
        "1. The build fails on a missing symbol. 2. Fix imports before migrating."
    );
    assert_eq!(advisor.model(), "test-model");
}

#[tokio::test]
async fn test_gemini_advisor_sends_rendered_prompt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
        })))
        .mount(&mock_server)
        .await;

    let advisor = create_advisor(&mock_server);
    advisor.advise(&compile_context()).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Previous Reasoning: Java 11 project with 3 dependencies"));
    assert!(prompt.contains("cannot find symbol"));
}

#[tokio::test]
async fn test_gemini_advisor_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "Rate limit exceeded"}
        })))
        .mount(&mock_server)
        .await;

    let advisor = create_advisor(&mock_server);
    let error = advisor.advise(&compile_context()).await.unwrap_err();

    assert!(matches!(error, GatewayError::Status { status: 429, .. }));
    assert!(error.is_retryable());
    assert_eq!(error.service(), Some("advisor"));
}

#[tokio::test]
async fn test_gemini_advisor_no_candidates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&mock_server)
        .await;

    let advisor = create_advisor(&mock_server);
    let error = advisor.advise(&compile_context()).await.unwrap_err();

    assert!(matches!(error, GatewayError::Decode { .. }));
    assert!(error.to_string().contains("no candidates"));
}

#[tokio::test]
async fn test_gemini_advisor_empty_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "   "}]}}]
        })))
        .mount(&mock_server)
        .await;

    let advisor = create_advisor(&mock_server);
    let error = advisor.advise(&compile_context()).await.unwrap_err();

    assert!(error.to_string().contains("empty candidate text"));
}

#[tokio::test]
async fn test_gemini_api_key_stays_out_of_urls_and_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&mock_server)
        .await;

    let advisor = create_advisor(&mock_server);
    let error = advisor.advise(&compile_context()).await.unwrap_err();
    assert!(!error.to_string().contains("test-api-key"));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].url.query().is_none());

    let unreachable_uri = mock_server.uri();
    drop(mock_server);
    let advisor = GeminiAdvisor::with_base_url(
        "SECRET-API-KEY",
        "gemini-pro",
        unreachable_uri,
        TransportPolicy::no_retry(Duration::from_secs(2)),
    )
    .unwrap();
    let error = advisor.advise(&compile_context()).await.unwrap_err();

    assert!(matches!(error, GatewayError::Transport { .. }));
    assert!(!error.to_string().contains("SECRET-API-KEY"));
    assert!(!format!("{error:?}").contains("SECRET-API-KEY"));
    assert!(!format!("{advisor:?}").contains("SECRET-API-KEY"));
}
