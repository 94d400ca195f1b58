//! # Observability
//!
//! Prometheus metrics for the controller. Logging goes through `tracing`, set up in
//! `runtime::initialization`.

pub mod metrics;
