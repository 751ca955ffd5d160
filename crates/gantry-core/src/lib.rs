//! # gantry-core
//!
//! Core abstractions for the Gantry machine-telemetry backend.
//!
//! This crate provides the foundational types used across all Gantry
//! components:
//!
//! - **Event Model**: [`MachineEvent`] (the persisted record) and
//!   [`EventSubmission`] (the wire-side candidate)
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Logging initialization and span constructors
//!
//! ## Crate Boundary
//!
//! `gantry-core` is the only crate allowed to define shared primitives.
//! Storage, ingestion, and API crates all build on the types here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod event;
pub mod observability;

pub use error::{Error, Result};
pub use event::{EventSubmission, MachineEvent, UNKNOWN_DEFECT_COUNT};
pub use observability::{LogFormat, init_logging};
