//! chat-relay - relay between a chat web client and the OpenAI / ChatGPT backends
//!
//! This library provides the core functionality for the relay server. It
//! forwards user messages to the configured upstream, streams partial replies
//! back and gates access with a token allow-list file.

pub mod config;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod relay;
pub mod routes;
pub mod tokens;
pub mod upstream;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::config::{ApiModel, Config, UpstreamMode};
pub use crate::envelope::Envelope;
pub use crate::middleware::AuthStore;
pub use crate::relay::{chat_config, Continuation, ModelConfig, Relay};
pub use crate::upstream::{ChatMessage, ChatUpstream};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Relay bound to the upstream client selected at startup
    pub relay: Relay,
    /// Access gate reading the token allow-list
    pub auth: AuthStore,
}

impl AppState {
    /// Create a new application state, building the upstream client from the configuration
    pub fn new(config: Config) -> Result<Self> {
        let upstream = upstream::from_config(&config)?;
        Ok(Self::with_upstream(config, upstream))
    }

    /// Create an application state around an already constructed upstream client
    pub fn with_upstream(config: Config, upstream: Arc<dyn ChatUpstream>) -> Self {
        let relay = Relay::new(upstream, Duration::from_millis(config.timeout_ms));
        let auth = AuthStore::new(config.auth_file.clone());

        Self {
            config,
            start_time: Instant::now(),
            relay,
            auth,
        }
    }
}
