//! API server implementation.
//!
//! Provides health, ready, metrics, ingestion, and stats endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use gantry_ingest::IngestionService;
use gantry_stats::StatsAggregator;
use gantry_store::{EventStore, MemoryEventStore};

use crate::config::Config;
use gantry_core::Result;

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The event store shared by ingestion and stats.
    store: Arc<dyn EventStore>,
    /// Batch ingestion facade.
    ingestion: Arc<IngestionService>,
    /// Read-side aggregation.
    stats: Arc<StatsAggregator>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &"<EventStore>")
            .field("ingestion", &"<IngestionService>")
            .field("stats", &"<StatsAggregator>")
            .finish()
    }
}

impl AppState {
    /// Creates new application state over the given store.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn EventStore>) -> Self {
        let ingestion = Arc::new(IngestionService::new(Arc::clone(&store)));
        let stats = Arc::new(StatsAggregator::with_policy(
            Arc::clone(&store),
            config.stats.to_policy(),
        ));
        Self {
            config,
            store,
            ingestion,
            stats,
        }
    }

    /// Creates new application state with in-memory storage (for testing).
    #[must_use]
    pub fn with_memory_store(config: Config) -> Self {
        Self::new(config, Arc::new(MemoryEventStore::new()))
    }

    /// Returns the event store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn EventStore> {
        Arc::clone(&self.store)
    }

    /// Returns the ingestion facade.
    #[must_use]
    pub fn ingestion(&self) -> &IngestionService {
        &self.ingestion
    }

    /// Returns the stats aggregator.
    #[must_use]
    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check
/// that doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Returns 200 OK if the service can reach its store. A point lookup on a
/// key that never exists is sufficient to validate the storage path.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let check_key = "__gantry/ready-check";
    match state.store().find_by_id(check_key).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("store check failed: {e}")),
            }),
        ),
    }
}

// ============================================================================
// Server
// ============================================================================

/// The Gantry API server.
pub struct Server {
    config: Config,
    store: Arc<dyn EventStore>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("store", &"<EventStore>")
            .finish()
    }
}

impl Server {
    /// Creates a new server with the given configuration.
    ///
    /// Defaults to in-memory storage; use [`Self::with_store`] for a
    /// durable backend.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(MemoryEventStore::new()),
        }
    }

    /// Creates a new server with an explicit store.
    #[must_use]
    pub fn with_store(config: Config, store: Arc<dyn EventStore>) -> Self {
        Self { config, store }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let state = Arc::new(AppState::new(self.config.clone(), Arc::clone(&self.store)));

        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);

        Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .merge(crate::routes::routes())
            // Middleware (order matters): metrics outermost for timing,
            // then trace.
            .layer(TraceLayer::new_for_http())
            .layer(metrics_layer)
            .with_state(state)
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the server
    /// cannot bind to the port.
    pub async fn serve(&self) -> Result<()> {
        self.config.validate()?;

        crate::metrics::init_metrics();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(http_port = self.config.http_port, "Starting Gantry API server");

        let listener =
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| gantry_core::Error::Internal {
                    message: format!("failed to bind to {addr}: {e}"),
                })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| gantry_core::Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// This is useful for integration tests where you want to exercise
    /// the routes without binding to a port.
    #[doc(hidden)]
    #[must_use]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }
}
