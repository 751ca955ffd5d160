//! Metrics middleware and instrumentation for the Gantry API.
//!
//! Provides Prometheus-exportable metrics for request duration and
//! throughput, plus the `/metrics` exposition endpoint.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::ApiError;
use crate::server::AppState;

/// API request duration histogram.
pub const API_REQUEST_DURATION: &str = "gantry_api_request_duration_seconds";

/// API request counter.
pub const API_REQUEST_TOTAL: &str = "gantry_api_request_total";

const UNMATCHED_ENDPOINT: &str = "unmatched";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder and registers metric descriptions.
///
/// Call once at server startup. Safe to call multiple times; subsequent
/// calls are no-ops.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
            describe_histogram!(API_REQUEST_DURATION, "API request duration in seconds");
            describe_counter!(API_REQUEST_TOTAL, "API requests by method, path, and status");
            gantry_ingest::metrics::register_metrics();
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to install Prometheus recorder; /metrics disabled");
        }
    }
}

/// Records duration and count for every request, labeled by matched route.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ENDPOINT.to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    histogram!(
        API_REQUEST_DURATION,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone(),
    )
    .record(start.elapsed().as_secs_f64());
    counter!(
        API_REQUEST_TOTAL,
        "method" => method,
        "path" => path,
        "status" => status,
    )
    .increment(1);

    response
}

/// Serves the Prometheus text exposition, guarded by the optional shared
/// secret from config.
pub async fn serve_metrics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(secret) = state
        .config
        .metrics_secret
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        if !caller_knows_secret(&headers, secret) {
            return Err(ApiError::unauthorized("metrics access requires a secret"));
        }
    }

    match PROMETHEUS_HANDLE.get() {
        Some(handle) => Ok(handle.render().into_response()),
        None => Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response()),
    }
}

fn caller_knows_secret(headers: &HeaderMap, secret: &str) -> bool {
    if let Some(value) = headers.get("x-metrics-secret").and_then(|v| v.to_str().ok()) {
        if value == secret {
            return true;
        }
    }
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(bearer) = value.strip_prefix("Bearer ") {
            return bearer == secret;
        }
    }
    false
}
