//! # Metrics Module
//!
//! Prometheus metrics for monitoring the controller, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text encoding
//! - `controller_metrics` - Reconciliations, fetches, status writes and requeues

pub mod controller_metrics;
pub mod registry;

pub use controller_metrics::*;
pub use registry::*;
