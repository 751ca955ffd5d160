//! # gantry-stats
//!
//! Read-side consumer of the event store: machine-level health summaries
//! and line-level defect rankings.
//!
//! The aggregator performs no writes and holds no state beyond a store
//! handle and its [`StatsPolicy`]. Derived metrics follow the reporting
//! conventions the fleet dashboards expect: HALF_UP rounding, defect sums
//! that ignore unknown counts, and a floor on the rate window so short
//! queries do not inflate rates.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use utoipa::ToSchema;

use gantry_core::observability::stats_span;
use gantry_store::{EventStore, Result as StoreResult};

/// Policy knobs for machine health reporting.
///
/// Both values are deployment configuration; the defaults match the
/// thresholds the fleet dashboards were calibrated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsPolicy {
    /// Rates at or above this many defects per hour flag a warning.
    pub warning_threshold: f64,
    /// Minimum window, in hours, used as the rate denominator.
    pub min_window_hours: f64,
}

impl Default for StatsPolicy {
    fn default() -> Self {
        Self {
            warning_threshold: 2.0,
            min_window_hours: 1.0,
        }
    }
}

/// Machine health over a reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum HealthStatus {
    /// Defect rate below the warning threshold.
    Healthy,
    /// Defect rate at or above the warning threshold.
    Warning,
}

/// Health summary for one machine over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineStats {
    /// The machine summarized.
    pub machine_id: String,
    /// Window start (inclusive).
    pub start: DateTime<Utc>,
    /// Window end (exclusive).
    pub end: DateTime<Utc>,
    /// Events observed in the window.
    pub events_count: u64,
    /// Sum of known defect counts in the window.
    pub defects_count: i64,
    /// Defects per hour, rounded HALF_UP to one decimal.
    pub avg_defect_rate: f64,
    /// Health label derived from the unrounded rate.
    pub status: HealthStatus,
}

/// One line in the top-defect ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopDefectLine {
    /// The line (machine, or factory when filtered).
    pub line_id: String,
    /// Sum of known defect counts in the window.
    pub total_defects: i64,
    /// Events observed in the window.
    pub event_count: u64,
    /// Defects per hundred events, rounded HALF_UP to two decimals.
    pub defects_percent: f64,
}

/// Read-only aggregation over the event store.
pub struct StatsAggregator {
    store: Arc<dyn EventStore>,
    policy: StatsPolicy,
}

impl StatsAggregator {
    /// Creates an aggregator with the default policy.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_policy(store, StatsPolicy::default())
    }

    /// Creates an aggregator with an explicit policy.
    #[must_use]
    pub fn with_policy(store: Arc<dyn EventStore>, policy: StatsPolicy) -> Self {
        Self { store, policy }
    }

    /// Health summary for one machine over the half-open window
    /// `[start, end)`.
    ///
    /// The rate denominator is the window length in hours, floored at
    /// the policy's minimum so sub-hour windows do not inflate rates.
    ///
    /// # Errors
    ///
    /// Propagates store failures unchanged.
    pub async fn machine_stats(
        &self,
        machine_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<MachineStats> {
        let span = stats_span("machine_stats");
        self.machine_stats_inner(machine_id, start, end)
            .instrument(span)
            .await
    }

    #[allow(clippy::cast_precision_loss)]
    async fn machine_stats_inner(
        &self,
        machine_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<MachineStats> {
        let events = self
            .store
            .find_by_machine_and_range(machine_id, start, end)
            .await?;

        let events_count = events.len() as u64;
        let defects_count: i64 = events
            .iter()
            .filter(|e| e.has_known_defects())
            .map(|e| i64::from(e.defect_count))
            .sum();

        let window_hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
        let hours = window_hours.max(self.policy.min_window_hours);

        let rate = if events_count == 0 {
            0.0
        } else {
            defects_count as f64 / hours
        };
        let status = if rate < self.policy.warning_threshold {
            HealthStatus::Healthy
        } else {
            HealthStatus::Warning
        };

        Ok(MachineStats {
            machine_id: machine_id.to_string(),
            start,
            end,
            events_count,
            defects_count,
            avg_defect_rate: round_half_up(rate, 1),
            status,
        })
    }

    /// Lines ranked by defect total over `[start, end)`, truncated to
    /// `limit`.
    ///
    /// With `factory_id` set, the ranking is restricted to that factory
    /// and reported per factory line; otherwise machines rank
    /// individually.
    ///
    /// # Errors
    ///
    /// Propagates store failures unchanged.
    pub async fn top_defect_lines(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
        factory_id: Option<&str>,
    ) -> StoreResult<Vec<TopDefectLine>> {
        let span = stats_span("top_defect_lines");
        self.top_defect_lines_inner(start, end, limit, factory_id)
            .instrument(span)
            .await
    }

    #[allow(clippy::cast_precision_loss)]
    async fn top_defect_lines_inner(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
        factory_id: Option<&str>,
    ) -> StoreResult<Vec<TopDefectLine>> {
        let rows = self.store.top_defect_lines(start, end, factory_id).await?;

        let lines = rows
            .into_iter()
            .take(limit)
            .map(|row| {
                let percent = if row.event_count == 0 {
                    0.0
                } else {
                    row.total_defects as f64 * 100.0 / row.event_count as f64
                };
                TopDefectLine {
                    line_id: row.line_id,
                    total_defects: row.total_defects,
                    event_count: row.event_count,
                    defects_percent: round_half_up(percent, 2),
                }
            })
            .collect();
        Ok(lines)
    }
}

/// Rounds half-up (ties away from zero) to `decimals` places.
#[must_use]
fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
