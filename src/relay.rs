//! Request relay
//!
//! Validates the message, shapes the continuation for the configured upstream
//! mode, bounds the call with the configured timeout and wraps the outcome in
//! an [`Envelope`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::{
    config::ApiModel,
    envelope::Envelope,
    routes::metrics::record_relay,
    upstream::{ChatMessage, ChatUpstream, ProgressFn, SendOptions, UpstreamError},
    AppState,
};

/// Identifiers of a previous exchange, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub parent_message_id: Option<String>,
}

/// Relays messages to the one configured upstream
#[derive(Clone)]
pub struct Relay {
    upstream: Arc<dyn ChatUpstream>,
    api_model: ApiModel,
    timeout: Duration,
}

impl Relay {
    pub fn new(upstream: Arc<dyn ChatUpstream>, timeout: Duration) -> Self {
        let api_model = upstream.api_model();
        Self {
            upstream,
            api_model,
            timeout,
        }
    }

    pub fn api_model(&self) -> ApiModel {
        self.api_model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Continuation as the upstream of this mode expects it.
    ///
    /// The API backend only links replies through the parent message, the
    /// ChatGPT backend also needs the conversation it lives in.
    pub fn send_options(&self, continuation: Option<Continuation>) -> SendOptions {
        let Some(continuation) = continuation else {
            return SendOptions::default();
        };

        match self.api_model {
            ApiModel::ChatGptApi => SendOptions {
                conversation_id: None,
                parent_message_id: continuation.parent_message_id,
            },
            ApiModel::ChatGptUnofficialProxyApi => SendOptions {
                conversation_id: continuation.conversation_id,
                parent_message_id: continuation.parent_message_id,
            },
        }
    }

    /// Send a message upstream.
    ///
    /// Progress updates reach `on_progress` in arrival order and always before
    /// this returns. Errors and timeouts come back as a `Fail` envelope.
    #[instrument(skip_all, fields(api_model = %self.api_model))]
    pub async fn send_message(
        &self,
        message: &str,
        continuation: Option<Continuation>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Envelope<ChatMessage> {
        if message.is_empty() {
            return Envelope::fail("Message is empty");
        }

        let options = self.send_options(continuation);
        let noop = |_: &ChatMessage| {};
        let on_progress: &ProgressFn<'_> = match on_progress {
            Some(on_progress) => on_progress,
            None => &noop,
        };

        let start = Instant::now();
        let outcome = tokio::time::timeout(
            self.timeout,
            self.upstream.send_message(message, options, on_progress),
        )
        .await
        .unwrap_or(Err(UpstreamError::Timeout));
        let elapsed = start.elapsed();

        match outcome {
            Ok(reply) => {
                record_relay("success", self.api_model, elapsed);
                info!(
                    duration_ms = %elapsed.as_millis(),
                    chars = reply.text.chars().count(),
                    "Relay request completed"
                );
                Envelope::success(reply)
            }
            Err(e) => {
                record_relay(e.kind(), self.api_model, elapsed);
                error!(error = %e, duration_ms = %elapsed.as_millis(), "Relay request failed");
                Envelope::fail(e.to_string())
            }
        }
    }
}

/// Read-only status report of the running configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub api_model: ApiModel,
    /// Reverse proxy URL, or "-"
    pub reverse_proxy: String,
    pub timeout_ms: u64,
    /// SOCKS proxy as host:port, or "-"
    pub socks_proxy: String,
    /// Whether the access gate currently has tokens
    pub authorized: bool,
}

/// Describe the active configuration; never fails
pub async fn chat_config(state: &AppState) -> Envelope<ModelConfig> {
    let config = &state.config;

    Envelope::success(ModelConfig {
        api_model: state.relay.api_model(),
        reverse_proxy: config
            .api_reverse_proxy
            .clone()
            .unwrap_or_else(|| "-".to_string()),
        timeout_ms: config.timeout_ms,
        socks_proxy: config
            .socks_proxy
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        authorized: state.auth.has_tokens().await,
    })
}
