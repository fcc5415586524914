//! # DA Rollup Node
//!
//! Runs one consensus role (sequencer, validator or watchtower) on top of a
//! data-availability layer.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`DA_LOG`, default `info`)
//! 2. Load configuration from `DA_*` environment variables
//! 3. Build genesis and wire the adapters
//! 4. Start the role
//! 5. Run until Ctrl+C, then close the role and wait for it

use anyhow::Result;
use node_runtime::{load_config, NodeRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_env("DA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config();

    let runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
