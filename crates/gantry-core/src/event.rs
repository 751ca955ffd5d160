//! The machine event model.
//!
//! Two shapes exist for the same logical entity:
//!
//! - [`EventSubmission`] is what clients send: `receivedTime` may be absent
//!   (the ingestion facade assigns it at the boundary) and no version is
//!   carried.
//! - [`MachineEvent`] is the normalized record the store persists:
//!   `received_time` is always set and `version` tracks the row's mutation
//!   count. `version == None` marks a record that has never been persisted,
//!   so stores can distinguish insert intent from update intent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sentinel defect count meaning "not reported by the machine".
///
/// Rows carrying this value are excluded from every defect sum.
pub const UNKNOWN_DEFECT_COUNT: i32 = -1;

/// One reported cycle from one machine, keyed by `event_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineEvent {
    /// Externally assigned identifier; globally unique in the store.
    pub event_id: String,
    /// The machine that produced the cycle.
    pub machine_id: String,
    /// The line/factory the machine belongs to.
    pub factory_id: String,
    /// When the event occurred on the machine.
    pub event_time: DateTime<Utc>,
    /// When the event was received; the conflict-resolution clock.
    pub received_time: DateTime<Utc>,
    /// Cycle duration in milliseconds.
    pub duration_ms: i64,
    /// Defects observed during the cycle; [`UNKNOWN_DEFECT_COUNT`] if unknown.
    pub defect_count: i32,
    /// Row version assigned by the store; `None` until first persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl MachineEvent {
    /// Returns true when both events carry the same payload.
    ///
    /// The payload is the dedup-relevant subset: `duration_ms`,
    /// `defect_count`, `event_time`, `machine_id`, and `factory_id`.
    /// `received_time` and `version` are deliberately excluded.
    #[must_use]
    pub fn has_same_payload(&self, other: &Self) -> bool {
        self.duration_ms == other.duration_ms
            && self.defect_count == other.defect_count
            && self.event_time == other.event_time
            && self.machine_id == other.machine_id
            && self.factory_id == other.factory_id
    }

    /// Returns true when the defect count was actually reported.
    #[must_use]
    pub const fn has_known_defects(&self) -> bool {
        self.defect_count >= 0
    }

    /// Copies the incoming event's payload and receive time onto this
    /// record, preserving the stored `version` for the write-time check.
    pub fn apply_payload(&mut self, incoming: &Self) {
        self.duration_ms = incoming.duration_ms;
        self.defect_count = incoming.defect_count;
        self.event_time = incoming.event_time;
        self.machine_id.clone_from(&incoming.machine_id);
        self.factory_id.clone_from(&incoming.factory_id);
        self.received_time = incoming.received_time;
    }
}

/// A candidate event as submitted over the wire.
///
/// `event_id`, `duration_ms`, and `defect_count` default when absent so an
/// incomplete submission is rejected per-event by validation rather than
/// failing the whole batch at the JSON layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmission {
    /// Externally assigned identifier.
    #[serde(default)]
    pub event_id: String,
    /// The machine that produced the cycle.
    pub machine_id: String,
    /// The line/factory the machine belongs to.
    pub factory_id: String,
    /// When the event occurred on the machine.
    pub event_time: DateTime<Utc>,
    /// Client-asserted receive time; server-assigned when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_time: Option<DateTime<Utc>>,
    /// Cycle duration in milliseconds.
    #[serde(default)]
    pub duration_ms: i64,
    /// Defects observed during the cycle.
    #[serde(default)]
    pub defect_count: i32,
}

impl EventSubmission {
    /// Normalizes the submission into a never-persisted [`MachineEvent`],
    /// defaulting a missing receive time to `now`.
    #[must_use]
    pub fn into_event(self, now: DateTime<Utc>) -> MachineEvent {
        MachineEvent {
            event_id: self.event_id,
            machine_id: self.machine_id,
            factory_id: self.factory_id,
            event_time: self.event_time,
            received_time: self.received_time.unwrap_or(now),
            duration_ms: self.duration_ms,
            defect_count: self.defect_count,
            version: None,
        }
    }
}
