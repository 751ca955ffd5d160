//! Observability infrastructure for Gantry.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors used across all Gantry
//! components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `gantry_ingest=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for ingestion operations with standard fields.
#[must_use]
pub fn ingest_span(operation: &str, batch_size: usize) -> Span {
    tracing::info_span!("ingest", op = operation, batch_size = batch_size)
}

/// Creates a span for stats read operations.
#[must_use]
pub fn stats_span(operation: &str) -> Span {
    tracing::info_span!("stats", op = operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty);
    }

    #[test]
    fn span_helpers_create_spans() {
        let span = ingest_span("process_batch", 10);
        let _guard = span.enter();
        tracing::info!("test message in span");

        let span = stats_span("machine_stats");
        let _guard = span.enter();
        tracing::info!("stats message");
    }
}
