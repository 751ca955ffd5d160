//! The two-stage upsert engine.
//!
//! Stage A ([`UpsertEngine::bulk_upsert`]) is the happy path: one prefetch
//! round-trip, one atomic bulk write. It is not safe against concurrent
//! writers on the same key, so any store failure collapses the whole
//! winner set into Stage B ([`UpsertEngine::fallback_upsert`]), where each
//! row re-reads, re-classifies, and writes in its own transaction scope
//! with a bounded retry loop. One row's failure never affects another.

use std::sync::Arc;

use metrics::counter;

use gantry_core::MachineEvent;
use gantry_store::{EventStore, Result as StoreResult};

use crate::metrics::ROW_RETRIES;
use crate::response::{BatchIngestResponse, RejectionReason};

/// Per-row write attempts before a winner is rejected as
/// `CONCURRENCY_FAILURE`.
pub const MAX_RETRIES: u32 = 3;

/// Counters produced by a successful bulk upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertTally {
    /// Rows inserted for the first time.
    pub accepted: u64,
    /// Rows that replaced an older stored state.
    pub updated: u64,
    /// Winners dropped as stale or identical retries.
    pub deduped: u64,
}

/// How one winner relates to the currently stored row.
#[derive(Debug)]
enum Classification {
    /// No stored row; insert the winner as-is.
    Insert(MachineEvent),
    /// Stored row is older and differs; write the staged merge.
    Update(MachineEvent),
    /// Stored row is newer, or the payload is identical.
    Deduped,
}

/// The outcome of one per-row attempt.
#[derive(Debug, Clone, Copy)]
enum RowOutcome {
    Accepted,
    Updated,
    Deduped,
}

/// Writes coalesced, validated winners against the event store.
pub struct UpsertEngine {
    store: Arc<dyn EventStore>,
}

impl UpsertEngine {
    /// Creates an engine over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Decides what a winner means relative to the stored row.
    ///
    /// A winner with a receive time at or before the stored row's is
    /// stale; an identical payload is a retry; anything else stages the
    /// stored row mutated to carry the winner's fields, preserving the
    /// stored version for the write-time check.
    fn classify(winner: &MachineEvent, existing: Option<&MachineEvent>) -> Classification {
        let Some(existing) = existing else {
            return Classification::Insert(winner.clone());
        };
        if winner.received_time <= existing.received_time {
            return Classification::Deduped;
        }
        if winner.has_same_payload(existing) {
            return Classification::Deduped;
        }
        let mut staged = existing.clone();
        staged.apply_payload(winner);
        Classification::Update(staged)
    }

    /// Stage A: optimistic bulk upsert.
    ///
    /// Prefetches every winner's stored row in one round-trip, classifies
    /// in memory, and writes all staged rows in one atomic call.
    ///
    /// # Errors
    ///
    /// Any store error (including a version conflict on a single row)
    /// fails the whole stage; the caller discards the tally and falls
    /// back to [`Self::fallback_upsert`] over the same winner set.
    pub async fn bulk_upsert(&self, winners: &[MachineEvent]) -> StoreResult<UpsertTally> {
        let ids: Vec<String> = winners.iter().map(|w| w.event_id.clone()).collect();
        let existing = self.store.find_all_by_ids(&ids).await?;

        let mut tally = UpsertTally::default();
        let mut staged = Vec::new();
        for winner in winners {
            match Self::classify(winner, existing.get(&winner.event_id)) {
                Classification::Insert(row) => {
                    tally.accepted += 1;
                    staged.push(row);
                }
                Classification::Update(row) => {
                    tally.updated += 1;
                    staged.push(row);
                }
                Classification::Deduped => tally.deduped += 1,
            }
        }

        if !staged.is_empty() {
            self.store.save_all(&staged).await?;
        }
        Ok(tally)
    }

    /// Stage B: per-row fallback with bounded retries.
    ///
    /// Each winner is upserted independently; its outcome (or rejection)
    /// lands directly in `response`.
    pub async fn fallback_upsert(
        &self,
        winners: &[MachineEvent],
        response: &mut BatchIngestResponse,
    ) {
        for winner in winners {
            self.upsert_single(winner, response).await;
        }
    }

    async fn upsert_single(&self, winner: &MachineEvent, response: &mut BatchIngestResponse) {
        for attempt in 1..=MAX_RETRIES {
            match self.attempt_upsert(winner).await {
                Ok(RowOutcome::Accepted) => {
                    response.accepted += 1;
                    return;
                }
                Ok(RowOutcome::Updated) => {
                    response.updated += 1;
                    return;
                }
                Ok(RowOutcome::Deduped) => {
                    response.deduped += 1;
                    return;
                }
                Err(err) if err.is_concurrency_conflict() => {
                    counter!(ROW_RETRIES).increment(1);
                    tracing::debug!(
                        event_id = %winner.event_id,
                        attempt = attempt,
                        error = %err,
                        "row upsert lost a write race"
                    );
                    if attempt == MAX_RETRIES {
                        tracing::warn!(
                            event_id = %winner.event_id,
                            "row upsert exhausted retries"
                        );
                        response
                            .add_rejection(&winner.event_id, RejectionReason::ConcurrencyFailure);
                        return;
                    }
                }
                Err(err) => {
                    tracing::error!(
                        event_id = %winner.event_id,
                        error = %err,
                        "row upsert hit a store failure"
                    );
                    response.add_rejection(&winner.event_id, RejectionReason::InternalError);
                    return;
                }
            }
        }
    }

    /// One attempt: fresh read, classify, version-checked write.
    async fn attempt_upsert(&self, winner: &MachineEvent) -> StoreResult<RowOutcome> {
        let existing = self.store.find_by_id(&winner.event_id).await?;
        match Self::classify(winner, existing.as_ref()) {
            Classification::Insert(row) => {
                self.store.save_one(&row).await?;
                Ok(RowOutcome::Accepted)
            }
            Classification::Update(row) => {
                self.store.save_one(&row).await?;
                Ok(RowOutcome::Updated)
            }
            Classification::Deduped => Ok(RowOutcome::Deduped),
        }
    }
}
