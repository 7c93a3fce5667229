//! stash-worker entry point.
//!
//! Loads configuration, opens the store registry, runs install (and
//! activation when no older version is present), then serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use stash_client::{FetchClient, FetchConfig};
use stash_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;
mod worker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version, origin = %config.origin, "Starting stash worker on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Arc::new(worker::Worker::new(config, db.clone(), network)?);

    match worker.start().await {
        Ok(report) if report.update_available && report.activated.is_none() => {
            tracing::info!(version = %report.version, "installed; waiting for FORCE_ACTIVATE")
        }
        Ok(report) => tracing::info!(version = %report.version, "worker active"),
        Err(e) => tracing::error!(error = %e, "install failed; requests pass through to the network"),
    }

    let handler = handler::StashServer::new(worker);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    db.close().await?;
    Ok(())
}
