//! # gantry-store
//!
//! Durable keyed storage for machine events with row-level versioning.
//!
//! The [`EventStore`] trait defines the persistence contract the upsert
//! engine and the stats aggregator are written against.
//!
//! ## Design Principles
//!
//! - **Version-checked writes**: every save asserts the row's current
//!   version, so concurrent writers are detected rather than serialized
//! - **Atomic bulk writes**: [`EventStore::save_all`] is all-or-nothing,
//!   which lets the optimistic bulk stage fall back cleanly
//! - **Testability**: in-memory implementation for tests and development;
//!   a relational adapter (`UPDATE ... WHERE event_id=? AND version=?`)
//!   satisfies the same contract in production

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gantry_core::MachineEvent;

pub use error::{Result, StoreError};
pub use memory::MemoryEventStore;

/// One row of the top-defect-lines aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefectLineStats {
    /// The line the row aggregates over (machine or factory, see
    /// [`EventStore::top_defect_lines`]).
    pub line_id: String,
    /// Sum of known defect counts in the window.
    pub total_defects: i64,
    /// Number of events in the window, unknown-defect rows included.
    pub event_count: u64,
}

/// Storage abstraction for machine events.
///
/// The durable collection is logically `machine_events`, keyed on
/// `event_id`. The query surface implies three indexes for a relational
/// adapter: the primary key on `event_id`, a composite on
/// `(machine_id, event_time)` for machine range scans, and `event_time`
/// for the global aggregation windows.
///
/// ## Write Semantics
///
/// `save_all` and `save_one` are insert-or-update with a per-row version
/// check:
///
/// - a record with `version == None` must not yet exist; a racing insert
///   surfaces as [`StoreError::DuplicateKey`]
/// - a record with `version == Some(v)` must match the stored row's
///   current version; a stale version surfaces as
///   [`StoreError::VersionConflict`]
///
/// On success the store assigns the next version (`0` for inserts,
/// `v + 1` for updates). Between two concurrent writers on the same
/// `event_id`, exactly one succeeds per version step.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent batches.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Gets an event by primary key.
    ///
    /// Returns `None` if no row with that `event_id` exists.
    async fn find_by_id(&self, event_id: &str) -> Result<Option<MachineEvent>>;

    /// Gets all events for the given primary keys in a single round-trip.
    ///
    /// Missing ids are simply absent from the result map.
    async fn find_all_by_ids(&self, ids: &[String]) -> Result<HashMap<String, MachineEvent>>;

    /// Bulk insert-or-update with per-row version check.
    ///
    /// The call is atomic: if any row fails its version check, no row is
    /// written and the first failure is returned.
    async fn save_all(&self, events: &[MachineEvent]) -> Result<()>;

    /// Single-row insert-or-update with version check, in its own
    /// transaction scope.
    async fn save_one(&self, event: &MachineEvent) -> Result<()>;

    /// Events for one machine with `event_time` in the half-open window
    /// `[start, end)`.
    async fn find_by_machine_and_range(
        &self,
        machine_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MachineEvent>>;

    /// Defect totals per line over `[start, end)`, ordered by total
    /// descending (ties by `line_id` ascending).
    ///
    /// With `factory_id == None` rows group by `machine_id` (each machine
    /// reported as a line). With `factory_id == Some(f)` rows are filtered
    /// to that factory and grouped by `factory_id`. Unknown defect counts
    /// contribute zero to the total but still count toward `event_count`.
    async fn top_defect_lines(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        factory_id: Option<&str>,
    ) -> Result<Vec<DefectLineStats>>;

    /// Total of all known (`>= 0`) defect counts across the store.
    async fn sum_known_defects(&self) -> Result<i64>;
}
