//! # Reconciler Types
//!
//! Shared context and result types for reconciliation.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::store::{ResourceStore, StoreError};
use crate::crd::ChuckNorris;
use crate::provider::{FetchError, JokeProvider};
use kube::ResourceExt;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Stable identity of a `ChuckNorris` resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of an object delivered by the watch
    pub fn from_resource(resource: &ChuckNorris) -> Self {
        Self {
            namespace: resource
                .namespace()
                .unwrap_or_else(|| "default".to_string()),
            name: resource.name_any(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of one reconciliation
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Nothing more to do until the resource changes
    Settled,
    /// Try again later with backoff
    Retry(ReconcilerError),
    /// Unrecoverable for this resource; do not retry until it changes
    FatalSkip(String),
}

impl ReconcileOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, ReconcileOutcome::Settled)
    }
}

/// Errors that send a resource back for another attempt
#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    #[error("failed to load resource: {0}")]
    Load(#[source] StoreError),
    #[error("failed to fetch joke from upstream: {0}")]
    Fetch(#[source] FetchError),
    #[error("failed to update status: {0}")]
    Persist(#[source] StoreError),
    #[error("reconciliation cancelled")]
    Cancelled,
    #[error("reconciliation deadline exceeded")]
    DeadlineExceeded,
}

impl ReconcilerError {
    /// Label for metrics and requeue reasons
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Load(_) => "load-error",
            ReconcilerError::Fetch(_) => "fetch-error",
            ReconcilerError::Persist(StoreError::Conflict { .. }) => "conflict",
            ReconcilerError::Persist(_) => "persist-error",
            ReconcilerError::Cancelled => "cancelled",
            ReconcilerError::DeadlineExceeded => "deadline-exceeded",
        }
    }
}

/// Retry bookkeeping for one resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

/// Reconciler context shared by every reconciliation
pub struct Reconciler {
    /// Where `ChuckNorris` objects are loaded from and their status written to
    pub store: Arc<dyn ResourceStore>,
    /// Upstream joke source
    pub provider: Arc<dyn JokeProvider>,
    pub config: ControllerConfig,
    /// Backoff per resource key, owned by the error policy
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
    /// Cancelled on shutdown; every reconciliation listens on a child token
    pub shutdown: CancellationToken,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        provider: Arc<dyn JokeProvider>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            backoff_states: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Forget retry history for a resource once it settles
    pub fn clear_backoff(&self, key: &ResourceKey) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(&key.to_string());
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }
}
