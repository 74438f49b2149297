//! Errors raised while talking to an upstream provider

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("OpenAI error {status}: {body}")]
    OpenAi { status: u16, body: String },

    #[error("ChatGPT error {status}: {body}")]
    ChatGpt { status: u16, body: String },

    #[error("OpenAI timed out waiting for response")]
    Timeout,

    #[error("Invalid upstream payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Credential contains characters not allowed in a header")]
    InvalidCredential,

    #[error("Upstream closed the stream without a reply")]
    EmptyResponse,
}

impl UpstreamError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Network(_) => "network",
            UpstreamError::OpenAi { .. } | UpstreamError::ChatGpt { .. } => "status",
            UpstreamError::Timeout => "timeout",
            UpstreamError::InvalidPayload(_) => "payload",
            UpstreamError::InvalidCredential => "credential",
            UpstreamError::EmptyResponse => "empty",
        }
    }
}
