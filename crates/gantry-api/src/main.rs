//! `gantry-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP
//! server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use gantry_api::config::Config;
use gantry_api::server::Server;
use gantry_core::observability::{LogFormat, init_logging};
use gantry_store::{EventStore, MemoryEventStore};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));

    // A durable adapter implementing `EventStore` slots in here once the
    // deployment's database is wired up.
    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    if !config.debug {
        tracing::warn!("no durable store configured; using in-memory event store");
    }

    let server = Server::with_store(config, store);
    server.serve().await?;
    Ok(())
}
