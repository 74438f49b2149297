//! Session endpoints used by the web client before it starts chatting
//!
//! - `/session` tells the client whether it must ask the user for a token
//! - `/verify` checks a token the user typed in

use std::sync::Arc;

use axum::extract::State;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::ApiModel,
    envelope::Envelope,
    error::{AppError, AppResult},
    AppState,
};

const SECRET_KEY_EMPTY: &str = "Secret key is empty";
const SECRET_KEY_INVALID: &str = "密钥无效 | Secret key is invalid";

/// Session information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    /// Whether a token is required
    pub auth: bool,
    pub model: ApiModel,
}

/// Verify request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn session(State(state): State<Arc<AppState>>) -> Envelope<SessionInfo> {
    Envelope::success(SessionInfo {
        auth: state.auth.has_tokens().await,
        model: state.relay.api_model(),
    })
}

/// Check a token against the allow-list
///
/// With no tokens configured every token verifies.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Envelope<Option<()>>> {
    let request: VerifyRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    let token = request.token.as_deref().map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Ok(Envelope::fail(SECRET_KEY_EMPTY));
    }

    let auth = state.auth.load().await;
    if !auth.is_configured() || auth.allows(token) {
        info!("Token verified");
        Ok(Envelope::success(None))
    } else {
        Ok(Envelope::fail(SECRET_KEY_INVALID))
    }
}
