//! # Watch Loop
//!
//! Runs the kube-runtime controller over `ChuckNorris` resources.
//!
//! The controller never runs two reconciliations for the same object at once, so
//! each resource's load-fetch-persist sequence is serialized without extra locking.

use crate::constants;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::crd::ChuckNorris;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use anyhow::Result;
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::controller::{self, Controller};
use kube_runtime::watcher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Run the controller until a shutdown signal arrives
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub async fn run_watch_loop(resources: Api<ChuckNorris>, reconciler: Arc<Reconciler>) -> Result<()> {
    let watch_backoff = Arc::new(AtomicU64::new(constants::DEFAULT_WATCH_BACKOFF_START_MS));

    // Cancel in-flight fetches as soon as a signal arrives
    {
        let token = reconciler.shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, cancelling in-flight reconciliations");
            token.cancel();
        });
    }

    let controller_config =
        controller::Config::default().concurrency(reconciler.config.max_concurrent_reconciles);

    Controller::new(resources, watcher::Config::default())
        .with_config(controller_config)
        .shutdown_on_signal()
        .run(
            reconcile,
            handle_reconciliation_error,
            Arc::clone(&reconciler),
        )
        .for_each(|result| {
            let watch_backoff = Arc::clone(&watch_backoff);
            async move {
                match result {
                    Ok((object_ref, _action)) => {
                        watch_backoff
                            .store(constants::DEFAULT_WATCH_BACKOFF_START_MS, Ordering::Relaxed);
                        debug!("Reconciled {}", object_ref);
                    }
                    Err(controller::Error::ReconcilerFailed(e, object_ref)) => {
                        // Already logged and requeued by the error policy
                        debug!("Reconciliation of {} will be retried: {}", object_ref, e);
                    }
                    Err(e) => {
                        handle_watch_stream_error(
                            &e.to_string(),
                            &watch_backoff,
                            constants::DEFAULT_WATCH_BACKOFF_MAX_MS,
                        )
                        .await;
                    }
                }
            }
        })
        .await;

    info!("Controller watch loop stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
