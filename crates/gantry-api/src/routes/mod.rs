//! HTTP route handlers.

pub mod events;
pub mod stats;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// All application routes (ingestion + stats).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().merge(events::routes()).merge(stats::routes())
}
