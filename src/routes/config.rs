//! Configuration introspection endpoint

use std::sync::Arc;

use axum::extract::State;

use crate::{
    envelope::Envelope,
    relay::{chat_config, ModelConfig},
    AppState,
};

/// Report the active upstream mode, proxies, timeout and whether auth is on
pub async fn config(State(state): State<Arc<AppState>>) -> Envelope<ModelConfig> {
    chat_config(&state).await
}
