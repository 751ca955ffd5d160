//! Shared test utilities for Gantry integration tests.
//!
//! This crate provides:
//! - [`EventBuilder`]: fluent factory for test events and submissions
//! - [`unique_event_id`]: collision-free ids for throughput/race tests
//! - [`init_test_logging`]: opt-in tracing output while debugging tests
//!
//! # Example
//!
//! ```rust
//! use gantry_test_utils::EventBuilder;
//!
//! let submission = EventBuilder::new("EV-1").defects(3).submission();
//! assert_eq!(submission.event_id, "EV-1");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

use chrono::{DateTime, Duration, Utc};
use ulid::Ulid;

use gantry_core::{EventSubmission, MachineEvent};

/// Fluent builder for test events.
///
/// Defaults: machine `M1`, factory `F1`, event time now, receive time
/// unset (submissions) or now (events), duration 100 ms, zero defects.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event_id: String,
    machine_id: String,
    factory_id: String,
    event_time: DateTime<Utc>,
    received_time: Option<DateTime<Utc>>,
    duration_ms: i64,
    defect_count: i32,
}

impl EventBuilder {
    /// Starts a builder for the given event id.
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            machine_id: "M1".to_string(),
            factory_id: "F1".to_string(),
            event_time: Utc::now(),
            received_time: None,
            duration_ms: 100,
            defect_count: 0,
        }
    }

    /// Sets the machine id.
    pub fn machine(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_id = machine_id.into();
        self
    }

    /// Sets the factory id.
    pub fn factory(mut self, factory_id: impl Into<String>) -> Self {
        self.factory_id = factory_id.into();
        self
    }

    /// Sets the event time.
    pub fn event_time(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = event_time;
        self
    }

    /// Sets an explicit receive time.
    pub fn received_at(mut self, received_time: DateTime<Utc>) -> Self {
        self.received_time = Some(received_time);
        self
    }

    /// Sets the receive time relative to now, in seconds.
    pub fn received_offset_secs(mut self, offset: i64) -> Self {
        self.received_time = Some(Utc::now() + Duration::seconds(offset));
        self
    }

    /// Sets the cycle duration.
    pub fn duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Sets the defect count.
    pub fn defects(mut self, defect_count: i32) -> Self {
        self.defect_count = defect_count;
        self
    }

    /// Builds a wire-side submission.
    pub fn submission(self) -> EventSubmission {
        EventSubmission {
            event_id: self.event_id,
            machine_id: self.machine_id,
            factory_id: self.factory_id,
            event_time: self.event_time,
            received_time: self.received_time,
            duration_ms: self.duration_ms,
            defect_count: self.defect_count,
        }
    }

    /// Builds a normalized, never-persisted event.
    pub fn event(self) -> MachineEvent {
        let received_time = self.received_time.unwrap_or(self.event_time);
        MachineEvent {
            event_id: self.event_id,
            machine_id: self.machine_id,
            factory_id: self.factory_id,
            event_time: self.event_time,
            received_time,
            duration_ms: self.duration_ms,
            defect_count: self.defect_count,
            version: None,
        }
    }
}

/// Returns a globally unique event id.
pub fn unique_event_id() -> String {
    Ulid::new().to_string()
}

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("gantry=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
