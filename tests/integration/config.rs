//! Configuration introspection and health endpoint tests
//!
//! - POST /config - active upstream mode, proxies, timeout and auth state
//! - GET /health, /health/live

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{Mode, TestApp};

#[tokio::test]
async fn test_config_in_direct_mode() {
    let app = TestApp::start_with(
        Mode::Direct,
        None,
        &[
            ("TIMEOUT_MS", "45000"),
            ("SOCKS_PROXY_HOST", "127.0.0.1"),
            ("SOCKS_PROXY_PORT", "1080"),
        ],
    )
    .await;

    let json: Value = app.post("/config", json!({}), None).await.json();
    assert_eq!(
        json,
        json!({
            "type": "Success",
            "data": {
                "apiModel": "ChatGPTAPI",
                "reverseProxy": "-",
                "timeoutMs": 45000,
                "socksProxy": "127.0.0.1:1080",
                "authorized": false,
            }
        })
    );
}

#[tokio::test]
async fn test_config_in_proxy_mode() {
    let app = TestApp::start(Mode::Proxy, None).await;

    let json: Value = app.post("/config", json!({}), None).await.json();
    assert_eq!(json["data"]["apiModel"], "ChatGPTUnofficialProxyAPI");
    assert_eq!(
        json["data"]["reverseProxy"],
        format!("{}/api/conversation", app.upstream.uri())
    );
    assert_eq!(json["data"]["socksProxy"], "-");
    assert_eq!(json["data"]["timeoutMs"], 30000);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::start(Mode::Direct, None).await;

    let response = app.server.get("/health/live").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["api_model"], "ChatGPTAPI");
    assert!(json.get("uptime_seconds").is_some());
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn test_config_reports_reverse_proxy_in_direct_mode() {
    let app = TestApp::start_with(
        Mode::Direct,
        None,
        &[("API_REVERSE_PROXY", "https://proxy.test/api/conversation")],
    )
    .await;

    let json: Value = app.post("/config", json!({}), None).await.json();
    assert_eq!(json["data"]["apiModel"], "ChatGPTAPI");
    assert_eq!(
        json["data"]["reverseProxy"],
        "https://proxy.test/api/conversation"
    );
    assert_eq!(app.upstream_requests().await, 0);
}
