//! # gantry-ingest
//!
//! The batch ingestion pipeline for machine telemetry events.
//!
//! A batch moves through four stages, composed by [`IngestionService`]:
//!
//! 1. **Validation** ([`validate`]): pure, per-event checks; failures are
//!    reported as rejections and never reach the store
//! 2. **Coalescing** ([`coalesce`]): at most one winner per `event_id`,
//!    newest receive time wins
//! 3. **Optimistic bulk upsert**: one prefetch round-trip plus one atomic
//!    bulk write ([`UpsertEngine::bulk_upsert`])
//! 4. **Per-row fallback**: on any bulk conflict, each winner retries in
//!    its own write with re-read-and-classify semantics
//!    ([`UpsertEngine::fallback_upsert`])
//!
//! The response counters satisfy
//! `accepted + updated + deduped + rejected == batch size` for every
//! completed batch.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod coalesce;
pub mod engine;
pub mod metrics;
pub mod response;
pub mod service;
pub mod validate;

pub use coalesce::{CoalesceOutcome, coalesce};
pub use engine::{MAX_RETRIES, UpsertEngine, UpsertTally};
pub use response::{BatchIngestResponse, Rejection, RejectionReason};
pub use service::IngestionService;
pub use validate::{FUTURE_TOLERANCE_SECS, MAX_DURATION_MS, validate};
