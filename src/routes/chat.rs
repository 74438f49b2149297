//! Chat process endpoint
//!
//! Streams every partial reply to the client as newline-separated JSON
//! objects while the upstream is still answering.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures::{channel::mpsc, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    envelope::Envelope,
    error::{AppError, AppResult},
    relay::Continuation,
    upstream::ChatMessage,
    AppState,
};

/// Chat process request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatProcessRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: Option<Continuation>,
}

/// Joins JSON lines with `\n`, without a leading separator
struct LineWriter {
    tx: mpsc::UnboundedSender<Bytes>,
    first: AtomicBool,
}

impl LineWriter {
    fn write<T: Serialize>(&self, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize chat update");
                return;
            }
        };

        let line = if self.first.swap(false, Ordering::SeqCst) {
            json
        } else {
            format!("\n{}", json)
        };

        // The client may have gone away; the relay still runs to completion
        if self.tx.unbounded_send(Bytes::from(line)).is_err() {
            debug!("Chat client disconnected");
        }
    }
}

/// Handle chat process requests
///
/// The body is `{prompt, options?: {conversationId?, parentMessageId?}}`.
/// Each progress update is written as one JSON line; a failure is written as
/// a final `Fail` envelope line.
pub async fn chat_process(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Response> {
    let request: ChatProcessRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    info!(
        has_continuation = request.options.is_some(),
        "Processing chat request"
    );

    let (tx, rx) = mpsc::unbounded::<Bytes>();

    tokio::spawn(async move {
        let writer = LineWriter {
            tx,
            first: AtomicBool::new(true),
        };
        let on_progress = |chat: &ChatMessage| writer.write(chat);

        let envelope = state
            .relay
            .send_message(
                request.prompt.as_deref().unwrap_or_default(),
                request.options,
                Some(&on_progress),
            )
            .await;

        if let Envelope::Fail { .. } = envelope {
            writer.write(&envelope);
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(rx.map(Ok::<_, Infallible>)))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}
