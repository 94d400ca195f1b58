//! # Reconciliation
//!
//! The decision algorithm for a single `ChuckNorris` resource, and the kube-runtime
//! entry point that wraps it.
//!
//! One invocation is a strict sequence: load, decide, fetch at most once, write
//! status at most once. Nothing is retried internally; retries are the caller's job.

use crate::constants::CONDITION_TYPE_FETCH_UPSTREAM;
use crate::controller::reconciler::signal::ReconcileSignal;
use crate::controller::reconciler::types::{
    ReconcileOutcome, Reconciler, ReconcilerError, ResourceKey,
};
use crate::crd::ChuckNorris;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Reconcile the resource identified by `key`
///
/// Always re-loads the object; never trusts a copy delivered with the event.
pub async fn reconcile_key(
    ctx: &Reconciler,
    key: &ResourceKey,
    signal: &ReconcileSignal,
) -> ReconcileOutcome {
    let resource = match ctx.store.load(key).await {
        Ok(Some(resource)) => resource,
        Ok(None) => {
            // Deleted between event and processing
            debug!("ChuckNorris {} not found, nothing to do", key);
            return ReconcileOutcome::Settled;
        }
        Err(e) => {
            error!("Error fetching ChuckNorris {}: {}", key, e);
            return ReconcileOutcome::Retry(ReconcilerError::Load(e));
        }
    };

    let generation = resource.metadata.generation;
    let mut status = resource.status.clone().unwrap_or_default();

    if status.is_settled(generation) {
        info!(generation = ?generation, "Resource already reconciled");
        observability::metrics::increment_reconciliations_skipped();
        return ReconcileOutcome::Settled;
    }

    let category = resource.spec.category;
    info!(category = %category, generation = ?generation, "Reconciling resource");
    if let Some(last) = status.latest_condition(CONDITION_TYPE_FETCH_UPSTREAM) {
        debug!(
            previous_reason = last.reason.as_deref().unwrap_or_default(),
            previous_time = last.last_transition_time.as_deref().unwrap_or_default(),
            "Previous fetch outcome"
        );
    }

    let fetched = tokio::select! {
        biased;
        reason = signal.fired() => {
            warn!("Reconciliation of {} aborted before fetch completed: {}", key, reason);
            return ReconcileOutcome::Retry(reason);
        }
        result = ctx.provider.fetch(category) => result,
    };

    let resource_version = resource.metadata.resource_version.as_deref();

    match fetched {
        Ok(joke) => {
            observability::metrics::increment_fetches("success");
            status.record_fetch_success(joke, generation, chrono::Utc::now());

            match ctx.store.write_status(key, resource_version, &status).await {
                Ok(()) => {
                    observability::metrics::increment_status_writes("success");
                    info!("✅ Fetched joke for {} (category {})", key, category);
                    ReconcileOutcome::Settled
                }
                Err(e) => {
                    // Fetched joke is dropped; the next attempt fetches again
                    observability::metrics::increment_status_writes("error");
                    error!("Unable to update ChuckNorris status for {}: {}", key, e);
                    ReconcileOutcome::Retry(ReconcilerError::Persist(e))
                }
            }
        }
        Err(fetch_error) => {
            observability::metrics::increment_fetches(fetch_error.kind());
            error!(
                "Unable to get joke from the upstream API for {}: {}",
                key, fetch_error
            );
            status.record_fetch_failure(&fetch_error.to_string(), chrono::Utc::now());

            match ctx.store.write_status(key, resource_version, &status).await {
                Ok(()) => {
                    observability::metrics::increment_status_writes("success");
                    ReconcileOutcome::Retry(ReconcilerError::Fetch(fetch_error))
                }
                Err(e) => {
                    // The persist error wins: the fetch failure never reached the history
                    observability::metrics::increment_status_writes("error");
                    error!("Unable to update ChuckNorris status for {}: {}", key, e);
                    ReconcileOutcome::Retry(ReconcilerError::Persist(e))
                }
            }
        }
    }
}

/// kube-runtime reconcile entry point
///
/// Maps [`ReconcileOutcome`] onto controller actions: settled resources wait for the
/// next change, retries go through the error policy's backoff.
pub async fn reconcile(
    resource: Arc<ChuckNorris>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let key = ResourceKey::from_resource(&resource);
    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.reconcile",
        resource.name = %key.name,
        resource.namespace = %key.namespace,
        resource.kind = "ChuckNorris"
    );

    async move {
        observability::metrics::increment_reconciliations();
        let start = Instant::now();

        let signal = ReconcileSignal::new(ctx.shutdown.child_token())
            .with_deadline(ctx.config.reconcile_deadline());
        let outcome = reconcile_key(&ctx, &key, &signal).await;

        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        match outcome {
            ReconcileOutcome::Settled => {
                ctx.clear_backoff(&key);
                Ok(Action::await_change())
            }
            ReconcileOutcome::Retry(e) => Err(e),
            ReconcileOutcome::FatalSkip(reason) => {
                error!("Skipping {} until it changes: {}", key, reason);
                ctx.clear_backoff(&key);
                Ok(Action::await_change())
            }
        }
    }
    .instrument(span)
    .await
}
