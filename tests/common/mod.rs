//! Common test utilities for the relay
//!
//! Builds the real application against a wiremock upstream and a temporary
//! auth file, plus helpers to fake the two upstream SSE protocols.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum_test::{TestResponse, TestServer};
use chat_relay::{routes::create_router, AppState, Config};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

/// Test configuration constants
pub mod constants {
    pub const TEST_API_KEY: &str = "sk-test-api-key";
    pub const TEST_ACCESS_TOKEN: &str = "test-access-token";
    pub const ALLOWED_TOKEN: &str = "abc";
    pub const AUTH_FILE_ABC: &str = r#"{"abc": {"allow": true}, "revoked": {"allow": false}}"#;
}

/// Which upstream the app under test talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Direct,
    Proxy,
}

/// Running application under test
pub struct TestApp {
    pub server: TestServer,
    pub upstream: MockServer,
    auth_dir: TempDir,
}

impl TestApp {
    /// Start an app in the given mode with an optional auth file
    pub async fn start(mode: Mode, auth_file: Option<&str>) -> Self {
        Self::start_with(mode, auth_file, &[]).await
    }

    /// Start an app with extra environment variables
    pub async fn start_with(mode: Mode, auth_file: Option<&str>, extra: &[(&str, &str)]) -> Self {
        let upstream = MockServer::start().await;
        let auth_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let auth_path = auth_dir.path().join("auth.json");
        if let Some(contents) = auth_file {
            std::fs::write(&auth_path, contents).expect("Failed to write auth file");
        }

        let mut vars: HashMap<String, String> = HashMap::new();
        match mode {
            Mode::Direct => {
                vars.insert("OPENAI_API_KEY".into(), constants::TEST_API_KEY.into());
                vars.insert("OPENAI_API_BASE_URL".into(), upstream.uri());
            }
            Mode::Proxy => {
                vars.insert("OPENAI_ACCESS_TOKEN".into(), constants::TEST_ACCESS_TOKEN.into());
                vars.insert(
                    "API_REVERSE_PROXY".into(),
                    format!("{}/api/conversation", upstream.uri()),
                );
            }
        }
        vars.insert(
            "AUTH_FILE".into(),
            auth_path.to_string_lossy().to_string(),
        );
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test config");
        let state = AppState::new(config).expect("Failed to build app state");
        let server = TestServer::new(create_router(Arc::new(state))).expect("Failed to create test server");

        Self {
            server,
            upstream,
            auth_dir,
        }
    }

    /// POST a JSON body, optionally with a bearer token
    pub async fn post(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut request = self.server.post(path).json(&body);
        if let Some(token) = token {
            request = request.add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            );
        }
        request.await
    }

    /// Number of requests the fake upstream has seen
    pub async fn upstream_requests(&self) -> usize {
        self.upstream
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or_default()
    }

    /// Body of the first request the fake upstream received
    pub async fn first_upstream_body(&self) -> Value {
        let requests = self.upstream.received_requests().await.unwrap_or_default();
        let request = requests.first().expect("No upstream request received");
        serde_json::from_slice(&request.body).expect("Upstream body is not JSON")
    }
}

/// Split a chat-process response into its JSON lines
pub fn json_lines(body: &str) -> Vec<Value> {
    body.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("Line is not JSON"))
        .collect()
}

/// Fake upstream SSE bodies
pub mod sse {
    use super::*;

    /// Chat completion chunks for the given deltas, followed by `[DONE]`
    pub fn openai_stream(id: &str, deltas: &[&str]) -> String {
        let mut body = String::new();
        for delta in deltas {
            let chunk = json!({
                "id": id,
                "object": "chat.completion.chunk",
                "created": 1706745600,
                "model": "gpt-3.5-turbo",
                "choices": [{"index": 0, "delta": {"content": delta}, "finish_reason": null}],
            });
            body.push_str(&format!("data: {}\n\n", chunk));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    /// ChatGPT conversation events carrying growing texts, followed by `[DONE]`
    pub fn chatgpt_stream(message_id: &str, conversation_id: &str, texts: &[&str]) -> String {
        let mut body = String::new();
        for text in texts {
            let event = json!({
                "message": {
                    "id": message_id,
                    "author": {"role": "assistant"},
                    "content": {"content_type": "text", "parts": [text]},
                },
                "conversation_id": conversation_id,
                "error": null,
            });
            body.push_str(&format!("data: {}\n\n", event));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }
}
