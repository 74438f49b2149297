//! Upstream module
//!
//! Clients for the two supported conversation backends, behind one trait so
//! the relay does not care which one was configured.

pub mod error;
pub mod openai;
pub mod sse;
pub mod types;
pub mod unofficial;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::info;

pub use error::UpstreamError;
pub use openai::OpenAiClient;
pub use types::{ChatMessage, Role, SendOptions};
pub use unofficial::UnofficialProxyClient;

use crate::config::{ApiModel, Config, SocksProxy, UpstreamMode};

/// Receives every partial reply, in arrival order
pub type ProgressFn<'a> = dyn for<'m> Fn(&'m ChatMessage) + Send + Sync + 'a;

/// Interface of a conversation backend
///
/// Implementations must invoke `on_progress` only while `send_message` is
/// running; once the future resolves or is dropped no further calls happen.
#[async_trait]
pub trait ChatUpstream: Send + Sync {
    /// Mode label of this backend
    fn api_model(&self) -> ApiModel;

    /// Send one user message and resolve with the complete reply
    async fn send_message(
        &self,
        text: &str,
        options: SendOptions,
        on_progress: &ProgressFn<'_>,
    ) -> Result<ChatMessage, UpstreamError>;
}

/// Build the outbound HTTP client, routed through the SOCKS proxy when configured
pub fn build_http_client(socks_proxy: Option<&SocksProxy>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(100)
        .connect_timeout(Duration::from_secs(30));

    if let Some(socks) = socks_proxy {
        let proxy = reqwest::Proxy::all(socks.url()).context("Invalid SOCKS proxy address")?;
        builder = builder.proxy(proxy);
        info!(proxy = %socks, "Routing upstream traffic through SOCKS proxy");
    }

    builder.build().context("Failed to build HTTP client")
}

/// Construct the upstream client selected by the configuration
pub fn from_config(config: &Config) -> Result<Arc<dyn ChatUpstream>> {
    let http_client = build_http_client(config.socks_proxy.as_ref())?;

    let upstream: Arc<dyn ChatUpstream> = match &config.mode {
        UpstreamMode::Direct {
            api_key,
            api_base_url,
            model,
        } => Arc::new(OpenAiClient::new(
            http_client,
            api_key,
            api_base_url.as_deref(),
            model,
        )?),
        UpstreamMode::Proxy {
            access_token,
            reverse_proxy_url,
        } => Arc::new(UnofficialProxyClient::new(
            http_client,
            access_token,
            reverse_proxy_url.as_deref(),
        )),
    };

    info!(api_model = %upstream.api_model(), "Upstream client configured");
    Ok(upstream)
}

/// Headers sent with every upstream request
pub(crate) fn bearer_headers(token: &str) -> Result<HeaderMap, UpstreamError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| UpstreamError::InvalidCredential)?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Read the body of a failed response for the error message
pub(crate) async fn error_body(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    (status, body)
}
