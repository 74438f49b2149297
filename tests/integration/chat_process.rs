//! Chat process endpoint integration tests
//!
//! Tests for POST /chat-process in both upstream modes:
//! - progress lines streamed in order
//! - continuation shaping per mode
//! - empty message, upstream errors and timeouts reported as Fail lines

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{constants, json_lines, sse, Mode, TestApp};

async fn mock_openai(app: &TestApp, body: String) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header(
            "Authorization",
            format!("Bearer {}", constants::TEST_API_KEY).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&app.upstream)
        .await;
}

#[tokio::test]
async fn test_empty_prompt_fails_without_upstream_call() {
    let app = TestApp::start(Mode::Direct, None).await;

    for body in [json!({"prompt": ""}), json!({})] {
        let response = app.post("/chat-process", body, None).await;
        response.assert_status_ok();
        assert_eq!(
            json_lines(&response.text()),
            vec![json!({"type": "Fail", "message": "Message is empty"})]
        );
    }

    assert_eq!(app.upstream_requests().await, 0);
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let app = TestApp::start(Mode::Direct, None).await;

    let response = app
        .server
        .post("/chat-process")
        .text("{not json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_direct_mode_streams_progress() {
    let app = TestApp::start(Mode::Direct, None).await;
    mock_openai(&app, sse::openai_stream("chatcmpl-1", &["Hello", ",", " world"])).await;

    let response = app
        .post("/chat-process", json!({"prompt": "Say hello"}), None)
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/octet-stream"
    );

    let lines = json_lines(&response.text());
    let texts: Vec<&str> = lines.iter().map(|l| l["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["Hello", "Hello,", "Hello, world"]);

    let last = lines.last().unwrap();
    assert_eq!(last["id"], "chatcmpl-1");
    assert_eq!(last["role"], "assistant");
    assert!(last["parentMessageId"].is_string());
    assert!(last["detail"].is_object());

    let sent = app.first_upstream_body().await;
    assert_eq!(sent["messages"][1]["content"], "Say hello");
    assert_eq!(sent["stream"], true);
}

#[tokio::test]
async fn test_direct_mode_drops_conversation_id() {
    let app = TestApp::start(Mode::Direct, None).await;
    mock_openai(&app, sse::openai_stream("chatcmpl-2", &["ok"])).await;

    let response = app
        .post(
            "/chat-process",
            json!({
                "prompt": "Continue",
                "options": {"conversationId": "conv-1", "parentMessageId": "parent-1"},
            }),
            None,
        )
        .await;

    let lines = json_lines(&response.text());
    assert_eq!(lines.len(), 1);
    assert!(lines[0].get("conversationId").is_none());

    let sent = app.first_upstream_body().await;
    assert!(sent.get("conversation_id").is_none());
    assert!(sent.get("parent_message_id").is_none());
}

#[tokio::test]
async fn test_proxy_mode_forwards_continuation() {
    let app = TestApp::start(Mode::Proxy, Some("{}")).await;

    Mock::given(method("POST"))
        .and(path("/api/conversation"))
        .and(header(
            "Authorization",
            format!("Bearer {}", constants::TEST_ACCESS_TOKEN).as_str(),
        ))
        .and(body_partial_json(json!({
            "conversation_id": "conv-1",
            "parent_message_id": "parent-1",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse::chatgpt_stream("reply-1", "conv-1", &["Hi", "Hi there"]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .post(
            "/chat-process",
            json!({
                "prompt": "Continue",
                "options": {"conversationId": "conv-1", "parentMessageId": "parent-1"},
            }),
            None,
        )
        .await;

    let lines = json_lines(&response.text());
    let texts: Vec<&str> = lines.iter().map(|l| l["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["Hi", "Hi there"]);
    assert_eq!(lines[1]["conversationId"], "conv-1");
    assert_eq!(lines[1]["id"], "reply-1");
}

#[tokio::test]
async fn test_upstream_error_written_as_fail_line() {
    let app = TestApp::start(Mode::Direct, None).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&app.upstream)
        .await;

    let response = app.post("/chat-process", json!({"prompt": "Hi"}), None).await;
    assert_eq!(
        json_lines(&response.text()),
        vec![json!({"type": "Fail", "message": "OpenAI error 429: rate limited"})]
    );
}

#[tokio::test]
async fn test_timeout_written_as_fail_line() {
    let app = TestApp::start_with(Mode::Direct, None, &[("TIMEOUT_MS", "200")]).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse::openai_stream("chatcmpl-3", &["late"]), "text/event-stream")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&app.upstream)
        .await;

    let response = app.post("/chat-process", json!({"prompt": "Hi"}), None).await;
    let lines = json_lines(&response.text());
    let last: &Value = lines.last().unwrap();
    assert_eq!(last["type"], "Fail");
    assert_eq!(last["message"], "OpenAI timed out waiting for response");
}

#[tokio::test]
async fn test_api_prefix_routes_to_same_handler() {
    let app = TestApp::start(Mode::Direct, None).await;

    let response = app.post("/api/chat-process", json!({"prompt": ""}), None).await;
    assert_eq!(json_lines(&response.text())[0]["message"], "Message is empty");
}
