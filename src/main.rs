//! # ChuckNorris Controller
//!
//! A Kubernetes controller that fills `ChuckNorris` resources with a joke from
//! the upstream joke API.
//!
//! ## Overview
//!
//! For every `ChuckNorris` resource the controller:
//!
//! 1. **Loads the resource** - Missing resources are skipped silently
//! 2. **Checks its status** - Resources already settled for their generation are left alone
//! 3. **Fetches a joke** - At most one upstream request per reconciliation
//! 4. **Records the outcome** - Appends a `FetchUpstream` condition and persists the status
//!
//! Failed attempts are retried with a per-resource Fibonacci backoff.
//!
//! ## Features
//!
//! - **Optimistic concurrency**: Status writes carry the resource version they were computed from
//! - **Graceful shutdown**: SIGTERM cancels in-flight fetches without writing partial status
//! - **Prometheus metrics**: Exposes metrics for monitoring and observability
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

use anyhow::Result;
use chucknorris_controller::runtime::initialization::initialize;
use chucknorris_controller::runtime::watch_loop::run_watch_loop;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the controller runtime
    let init_result = initialize().await?;

    // Run the watch loop until a shutdown signal arrives
    run_watch_loop(init_result.resources, Arc::clone(&init_result.reconciler)).await?;

    // Stop the metrics and probe server
    init_result.reconciler.shutdown.cancel();
    if let Err(e) = init_result.server_handle.await {
        warn!("HTTP server task ended abnormally: {}", e);
    }

    info!("ChuckNorris controller stopped");
    Ok(())
}
