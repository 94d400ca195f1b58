//! # Reconciler
//!
//! Drives each `ChuckNorris` resource toward a status that reflects its spec.
//!
//! - `types` - Reconciler context, resource identity, outcomes and errors
//! - `store` - Load/persist seam and its Kubernetes implementation
//! - `signal` - Cancellation and deadline for a single reconciliation
//! - `reconcile` - The decision algorithm and the kube-runtime entry point

mod reconcile;
mod signal;
mod store;
mod types;

pub use reconcile::{reconcile, reconcile_key};
pub use signal::ReconcileSignal;
pub use store::{status_patch, KubeStore, ResourceStore, StoreError};
pub use types::{BackoffState, ReconcileOutcome, Reconciler, ReconcilerError, ResourceKey};
