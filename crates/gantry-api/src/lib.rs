//! # gantry-api
//!
//! HTTP API server for the Gantry telemetry backend.
//!
//! Exposes the ingestion endpoint (`POST /events/batch`), the stats
//! endpoints (`GET /stats`, `GET /stats/top-defect-lines`), operational
//! probes (`/health`, `/ready`), and Prometheus metrics (`/metrics`).

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::{AppState, Server};
