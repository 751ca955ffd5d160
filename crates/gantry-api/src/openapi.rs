//! `OpenAPI` (3.1) specification generation for `gantry-api`.
//!
//! The generated spec documents the ingestion and stats surface for
//! external clients and contract checks.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the Gantry REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gantry API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Machine telemetry ingestion and analytics API"
    ),
    paths(
        crate::routes::events::ingest_batch,
        crate::routes::stats::machine_stats,
        crate::routes::stats::top_defect_lines,
    ),
    components(schemas(
        crate::error::ApiErrorBody,
        gantry_core::EventSubmission,
        gantry_core::MachineEvent,
        gantry_ingest::BatchIngestResponse,
        gantry_ingest::Rejection,
        gantry_ingest::RejectionReason,
        gantry_stats::HealthStatus,
        gantry_stats::MachineStats,
        gantry_stats::TopDefectLine,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_contains_all_routes() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_value(&spec).unwrap();
        let paths = json["paths"].as_object().unwrap();
        assert!(paths.contains_key("/events/batch"));
        assert!(paths.contains_key("/stats"));
        assert!(paths.contains_key("/stats/top-defect-lines"));
    }
}
