//! Error types for store operations.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A version-checked write lost against a concurrent modification.
    #[error("version conflict on event {event_id}")]
    VersionConflict {
        /// The row whose version check failed.
        event_id: String,
    },

    /// An insert collided with an existing row for the same key.
    #[error("duplicate key: event {event_id} already exists")]
    DuplicateKey {
        /// The row that already exists.
        event_id: String,
    },

    /// The storage layer itself failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Returns true when the error is a concurrency conflict that a
    /// re-read and retry can resolve (as opposed to an infrastructure
    /// failure).
    #[must_use]
    pub const fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::DuplicateKey { .. })
    }
}
