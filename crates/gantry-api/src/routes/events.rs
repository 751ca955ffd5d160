//! Event ingestion routes.
//!
//! ## Routes
//!
//! - `POST /events/batch` - ingest a batch of telemetry events
//!
//! Partial success is the norm: the endpoint answers `200 OK` whenever the
//! request body parses, and callers inspect the counters and rejection
//! list. Only a malformed body is turned away at the HTTP layer.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use gantry_core::EventSubmission;
use gantry_ingest::BatchIngestResponse;

use crate::server::AppState;

/// Ingest a batch of machine events.
///
/// POST /events/batch
#[utoipa::path(
    post,
    path = "/events/batch",
    tag = "events",
    request_body = Vec<EventSubmission>,
    responses(
        (status = 200, description = "Per-event outcome counters and rejections", body = BatchIngestResponse),
        (status = 400, description = "Malformed request body"),
    )
)]
pub(crate) async fn ingest_batch(
    State(state): State<Arc<AppState>>,
    Json(submissions): Json<Vec<EventSubmission>>,
) -> Json<BatchIngestResponse> {
    let response = state.ingestion().process_batch(submissions).await;
    Json(response)
}

/// Ingestion routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/events/batch", post(ingest_batch))
}
