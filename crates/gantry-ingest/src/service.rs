//! The ingestion facade.
//!
//! [`IngestionService::process_batch`] is the single public entry point of
//! the pipeline: validate, default receive times, coalesce, then write
//! through the two-stage engine.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::Instrument;

use gantry_core::EventSubmission;
use gantry_core::observability::ingest_span;
use gantry_store::EventStore;

use crate::coalesce::coalesce;
use crate::engine::UpsertEngine;
use crate::metrics::{
    BULK_FALLBACKS, EVENTS_ACCEPTED, EVENTS_DEDUPED, EVENTS_REJECTED, EVENTS_UPDATED,
};
use crate::response::BatchIngestResponse;
use crate::validate::validate;

/// Processes event batches against a shared store.
///
/// Holds no per-batch state; concurrent `process_batch` calls are
/// independent and may race on overlapping keys, which the engine
/// resolves row by row.
pub struct IngestionService {
    engine: UpsertEngine,
}

impl IngestionService {
    /// Creates a service writing to the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            engine: UpsertEngine::new(store),
        }
    }

    /// Processes one batch and reports per-event outcomes.
    ///
    /// For a batch of `N` events the returned counters satisfy
    /// `accepted + updated + deduped + rejected == N`.
    pub async fn process_batch(&self, submissions: Vec<EventSubmission>) -> BatchIngestResponse {
        let span = ingest_span("process_batch", submissions.len());
        self.process_batch_inner(submissions).instrument(span).await
    }

    async fn process_batch_inner(
        &self,
        submissions: Vec<EventSubmission>,
    ) -> BatchIngestResponse {
        let mut response = BatchIngestResponse::new();
        let now = Utc::now();

        let mut survivors = Vec::with_capacity(submissions.len());
        for submission in submissions {
            match validate(&submission, now) {
                Err(reason) => response.add_rejection(submission.event_id.clone(), reason),
                Ok(()) => survivors.push(submission.into_event(now)),
            }
        }

        let outcome = coalesce(survivors);
        let in_batch_deduped = outcome.deduped;
        response.deduped += in_batch_deduped;

        match self.engine.bulk_upsert(&outcome.winners).await {
            Ok(tally) => {
                response.accepted += tally.accepted;
                response.updated += tally.updated;
                response.deduped += tally.deduped;
            }
            Err(err) => {
                counter!(BULK_FALLBACKS).increment(1);
                tracing::warn!(
                    error = %err,
                    winners = outcome.winners.len(),
                    "bulk upsert aborted; retrying winners row by row"
                );
                // Discard Stage A's tallies; keep the in-batch dedup count
                // the coalescer derived from this same winner set.
                response.reset_counters();
                response.deduped = in_batch_deduped;
                self.engine
                    .fallback_upsert(&outcome.winners, &mut response)
                    .await;
            }
        }

        counter!(EVENTS_ACCEPTED).increment(response.accepted);
        counter!(EVENTS_UPDATED).increment(response.updated);
        counter!(EVENTS_DEDUPED).increment(response.deduped);
        counter!(EVENTS_REJECTED).increment(response.rejected);

        tracing::info!(
            accepted = response.accepted,
            updated = response.updated,
            deduped = response.deduped,
            rejected = response.rejected,
            "batch processed"
        );
        response
    }
}
