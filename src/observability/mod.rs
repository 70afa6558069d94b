//! # Observability
//!
//! Prometheus metrics for lifecycle runs and backend lookups.

pub mod metrics;
