//! Ingestion metrics.
//!
//! Counter names for the batch pipeline. These complement the structured
//! logging already in place; registration describes each metric for
//! exporters that surface metadata.

use metrics::describe_counter;

/// Events stored for the first time.
pub const EVENTS_ACCEPTED: &str = "gantry_ingest_events_accepted_total";

/// Events that replaced an older stored state.
pub const EVENTS_UPDATED: &str = "gantry_ingest_events_updated_total";

/// Events ignored as duplicates or stale deliveries.
pub const EVENTS_DEDUPED: &str = "gantry_ingest_events_deduped_total";

/// Events rejected by validation or the upsert engine.
pub const EVENTS_REJECTED: &str = "gantry_ingest_events_rejected_total";

/// Batches whose optimistic bulk write aborted into per-row fallback.
pub const BULK_FALLBACKS: &str = "gantry_ingest_bulk_fallback_total";

/// Per-row write attempts retried after a concurrency conflict.
pub const ROW_RETRIES: &str = "gantry_ingest_row_retry_total";

/// Registers metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(EVENTS_ACCEPTED, "Events stored for the first time");
    describe_counter!(EVENTS_UPDATED, "Events that replaced an older stored state");
    describe_counter!(EVENTS_DEDUPED, "Events ignored as duplicate or stale deliveries");
    describe_counter!(EVENTS_REJECTED, "Events rejected by validation or the upsert engine");
    describe_counter!(BULK_FALLBACKS, "Bulk writes that aborted into per-row fallback");
    describe_counter!(ROW_RETRIES, "Per-row writes retried after a concurrency conflict");
}
