//! The batch ingestion response: counters plus per-event rejections.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Why an event was rejected from a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// The event carried no usable `eventId`.
    MissingEventId,
    /// `durationMs` was negative or implausibly long.
    InvalidDuration,
    /// `eventTime` was too far in the future.
    EventInFuture,
    /// Per-row retries exhausted against concurrent writers.
    ConcurrencyFailure,
    /// The store failed in a way retries cannot fix.
    InternalError,
}

/// One rejected event and the reason it was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// The `eventId` as submitted (possibly blank).
    pub event_id: String,
    /// Why the event was rejected.
    pub reason: RejectionReason,
}

/// The outcome of one `processBatch` call.
///
/// For a batch of `N` events,
/// `accepted + updated + deduped + rejected == N` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchIngestResponse {
    /// Events stored for the first time.
    pub accepted: u64,
    /// Events ignored as duplicates or stale deliveries.
    pub deduped: u64,
    /// Events that replaced an older stored state.
    pub updated: u64,
    /// Events rejected by validation or by the upsert engine.
    pub rejected: u64,
    /// One entry per rejected event.
    pub rejections: Vec<Rejection>,
}

impl BatchIngestResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejection and bumps the `rejected` counter.
    pub fn add_rejection(&mut self, event_id: impl Into<String>, reason: RejectionReason) {
        self.rejected += 1;
        self.rejections.push(Rejection {
            event_id: event_id.into(),
            reason,
        });
    }

    /// Zeroes the write-path counters, keeping rejections intact.
    ///
    /// Used when the optimistic bulk stage aborts: its tallies are
    /// discarded and the per-row stage re-derives them.
    pub fn reset_counters(&mut self) {
        self.accepted = 0;
        self.updated = 0;
        self.deduped = 0;
    }

    /// Sum of all four counters; equals the input batch size for a
    /// completed batch.
    #[must_use]
    pub const fn total_counted(&self) -> u64 {
        self.accepted + self.updated + self.deduped + self.rejected
    }
}
