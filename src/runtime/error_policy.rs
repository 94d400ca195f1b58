//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::constants;
use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError, ResourceKey};
use crate::crd::ChuckNorris;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing resource does not slow down
/// the others. The state is cleared when the resource settles.
pub fn handle_reconciliation_error(
    obj: Arc<ChuckNorris>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let key = ResourceKey::from_resource(&obj);

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = %key.name,
        resource.namespace = %key.namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {}", key, error);
    observability::metrics::increment_reconciliation_errors();

    let (backoff_seconds, error_count) = next_backoff(&ctx, &key);
    let backoff_seconds = backoff_seconds.min(constants::MAX_BACKOFF_SECS);

    info!(
        "🔄 Retrying {} with Fibonacci backoff: {}s (error count: {}, reason: {})",
        key,
        backoff_seconds,
        error_count,
        error.reason()
    );
    if let Some(next_trigger_time) = i64::try_from(backoff_seconds)
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
        .and_then(|delay| chrono::Utc::now().checked_add_signed(delay))
    {
        info!(
            "📅 Next retry scheduled: {} (in {}s)",
            next_trigger_time.to_rfc3339(),
            backoff_seconds
        );
    }

    observability::metrics::increment_requeues_total(error.reason());
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Advance the backoff for `key`, returning the delay and the error count
pub fn next_backoff(ctx: &Reconciler, key: &ResourceKey) -> (u64, u32) {
    match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(key.to_string()).or_insert_with(|| {
                BackoffState::new(ctx.config.backoff_min_secs, ctx.config.backoff_max_secs)
            });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!(
                "Failed to lock backoff_states: {}, using default backoff",
                e
            );
            (constants::DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS, 0)
        }
    }
}

/// Kind of watch stream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    TooManyRequests,
    NotFound,
    Other,
}

/// Classify a watch stream error from its message
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    if error_string.contains("401") || error_string.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::TooManyRequests
    } else if error_string.contains("ObjectNotFound")
        || (error_string.contains("404") && error_string.contains("not found"))
    {
        WatchErrorKind::NotFound
    } else {
        WatchErrorKind::Other
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Waits as appropriate for the error class before the stream carries on; kube-runtime
/// restarts the underlying watch on its own.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
) {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );

    let kind = classify_watch_error(error_string);
    {
        let _error_guard = error_span.enter();
        match kind {
            WatchErrorKind::Unauthorized => {
                error!("❌ Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired");
                error!("🔍 Verify the controller's ClusterRole still grants get/list/watch on chucknorris and get/patch on chucknorris/status");
                warn!(
                    "⏳ Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                    constants::DEFAULT_WATCH_RESTART_DELAY_SECS
                );
            }
            WatchErrorKind::Expired => {
                warn!("Watch resource version expired (410) - this is normal during pod restarts, watch will restart");
            }
            WatchErrorKind::TooManyRequests => {
                warn!(
                    "API server storage reinitializing (429), backing off for {}ms before restart...",
                    backoff.load(Ordering::Relaxed)
                );
            }
            WatchErrorKind::NotFound => {
                warn!("Resource not found (likely deleted), continuing watch...");
            }
            WatchErrorKind::Other => {
                error!("Controller stream error: {}", error_string);
            }
        }
    }

    match kind {
        WatchErrorKind::Unauthorized | WatchErrorKind::Other => {
            tokio::time::sleep(Duration::from_secs(
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS,
            ))
            .await;
        }
        WatchErrorKind::TooManyRequests => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            // Exponential backoff, max configured value
            let new_backoff = current_backoff.saturating_mul(2).min(max_backoff_ms);
            backoff.store(new_backoff, Ordering::Relaxed);
        }
        WatchErrorKind::Expired | WatchErrorKind::NotFound => {}
    }
}
