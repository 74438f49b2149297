//! Prometheus metrics endpoint
//!
//! Exposes relay metrics in Prometheus format for monitoring.

use std::time::Duration;

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

use crate::config::ApiModel;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;

    metrics::describe_counter!(
        "relay_requests_total",
        "Relay requests by outcome and upstream mode"
    );
    metrics::describe_histogram!(
        "relay_request_duration_seconds",
        "Time spent waiting on the upstream"
    );
    metrics::describe_counter!(
        "relay_auth_denied_total",
        "Requests rejected by the access gate"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a finished relay call
pub fn record_relay(outcome: &str, api_model: ApiModel, duration: Duration) {
    metrics::counter!(
        "relay_requests_total",
        "outcome" => outcome.to_string(),
        "api_model" => api_model.as_str()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "api_model" => api_model.as_str())
        .record(duration.as_secs_f64());
}

/// Record a request denied by the access gate
pub fn record_auth_denied() {
    metrics::counter!("relay_auth_denied_total").increment(1);
}
