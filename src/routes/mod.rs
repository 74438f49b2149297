//! HTTP routes for the relay
//!
//! This module defines all HTTP endpoints exposed to the web client. The API
//! is served both at the root and under `/api`.

pub mod chat;
pub mod config;
pub mod health;
pub mod metrics;
pub mod session;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{middleware::auth::auth_middleware, AppState};

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes behind the access gate
    let protected_routes = Router::new()
        .route("/chat-process", post(chat::chat_process))
        .route("/config", post(config::config))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // The web client calls these before it has a token
    let public_routes = Router::new()
        .route("/session", post(session::session))
        .route("/verify", post(session::verify));

    let api = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        // Global middleware (applied to all routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
