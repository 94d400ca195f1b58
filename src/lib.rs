//! ChuckNorris Controller Library
//!
//! This library provides the core functionality for the ChuckNorris controller:
//! the `ChuckNorris` custom resource, the reconciler that keeps its status in sync
//! with the upstream joke API, and the runtime that wires both into kube-runtime.
//! Tests are included in the module files and under `tests/`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;

// Re-export CRD types for convenience
pub use crd::*;
