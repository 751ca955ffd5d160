//! Analytics routes over the event store.
//!
//! ## Routes
//!
//! - `GET /stats` - health summary for one machine over a window
//! - `GET /stats/top-defect-lines` - lines ranked by defect total
//!
//! Window parameters are ISO-8601 instants; every window is half-open
//! (`start` inclusive, `end` exclusive).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use gantry_stats::{MachineStats, TopDefectLine};

use crate::error::ApiResult;
use crate::server::AppState;

/// Default number of lines returned by the top-defect ranking.
const DEFAULT_TOP_LINES_LIMIT: usize = 10;

/// Query parameters for `GET /stats`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MachineStatsParams {
    /// The machine to summarize.
    machine_id: String,
    /// Window start (inclusive), ISO-8601.
    start: DateTime<Utc>,
    /// Window end (exclusive), ISO-8601.
    end: DateTime<Utc>,
}

/// Query parameters for `GET /stats/top-defect-lines`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TopDefectLinesParams {
    /// Window start (inclusive), ISO-8601.
    from: DateTime<Utc>,
    /// Window end (exclusive), ISO-8601.
    to: DateTime<Utc>,
    /// Maximum number of lines to return.
    limit: Option<usize>,
    /// Restrict the ranking to one factory and report it as the line.
    factory_id: Option<String>,
}

/// Health summary for one machine.
///
/// GET /stats
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    params(MachineStatsParams),
    responses(
        (status = 200, description = "Machine health summary", body = MachineStats),
        (status = 400, description = "Missing or malformed query parameters"),
    )
)]
pub(crate) async fn machine_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MachineStatsParams>,
) -> ApiResult<Json<MachineStats>> {
    let summary = state
        .stats()
        .machine_stats(&params.machine_id, params.start, params.end)
        .await?;
    Ok(Json(summary))
}

/// Lines ranked by defect total.
///
/// GET /stats/top-defect-lines
#[utoipa::path(
    get,
    path = "/stats/top-defect-lines",
    tag = "stats",
    params(TopDefectLinesParams),
    responses(
        (status = 200, description = "Ranked defect lines", body = Vec<TopDefectLine>),
        (status = 400, description = "Missing or malformed query parameters"),
    )
)]
pub(crate) async fn top_defect_lines(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopDefectLinesParams>,
) -> ApiResult<Json<Vec<TopDefectLine>>> {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LINES_LIMIT);
    let lines = state
        .stats()
        .top_defect_lines(params.from, params.to, limit, params.factory_id.as_deref())
        .await?;
    Ok(Json(lines))
}

/// Stats routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(machine_stats))
        .route("/stats/top-defect-lines", get(top_defect_lines))
}
