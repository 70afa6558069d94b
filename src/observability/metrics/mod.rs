//! # Metrics Module
//!
//! Prometheus metrics for the acceptance harness, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text export
//! - `harness_metrics` - Lifecycle metrics (runs, steps, leaked resources)
//! - `lookup_metrics` - Existence lookups and raw backend requests

pub mod harness_metrics;
pub mod lookup_metrics;
pub mod registry;

pub use harness_metrics::*;
pub use lookup_metrics::*;
pub use registry::*;
