//! Pure per-event validation.
//!
//! Validation is deterministic, performs no store I/O, and never mutates
//! the candidate. Failures are reported back per event; they never reach
//! the store. A missing `receivedTime` is not a validation failure; the
//! facade defaults it at the boundary.

use chrono::{DateTime, Duration, Utc};

use gantry_core::EventSubmission;

use crate::response::RejectionReason;

/// Longest plausible cycle duration: six hours, in milliseconds.
pub const MAX_DURATION_MS: i64 = 6 * 60 * 60 * 1000;

/// Clock-skew allowance for `eventTime`: fifteen minutes, in seconds.
pub const FUTURE_TOLERANCE_SECS: i64 = 15 * 60;

/// Validates a candidate event against the reference `now`.
///
/// Checks run in order: identifier presence, duration bounds, future
/// timestamp. The first failure wins.
///
/// # Errors
///
/// Returns the [`RejectionReason`] describing the first failed check.
pub fn validate(submission: &EventSubmission, now: DateTime<Utc>) -> Result<(), RejectionReason> {
    if submission.event_id.trim().is_empty() {
        return Err(RejectionReason::MissingEventId);
    }
    if submission.duration_ms < 0 || submission.duration_ms > MAX_DURATION_MS {
        return Err(RejectionReason::InvalidDuration);
    }
    if submission.event_time > now + Duration::seconds(FUTURE_TOLERANCE_SECS) {
        return Err(RejectionReason::EventInFuture);
    }
    Ok(())
}
