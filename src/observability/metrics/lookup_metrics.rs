//! # Lookup Metrics
//!
//! Existence lookups as seen by the harness, and raw ARM request latency.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounterVec};
use std::sync::LazyLock;

static LOOKUPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cosmos_acctest_lookups_total",
            "Total number of collection existence lookups by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create LOOKUPS_TOTAL metric - this should never happen")
});

static LOOKUP_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cosmos_acctest_lookup_duration_seconds",
            "Duration of collection existence lookups in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create LOOKUP_DURATION metric - this should never happen")
});

static BACKEND_REQUEST_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cosmos_acctest_arm_request_duration_seconds",
            "Duration of ARM collection GET requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .expect("Failed to create BACKEND_REQUEST_DURATION metric - this should never happen")
});

pub(crate) fn register_lookup_metrics() -> Result<()> {
    REGISTRY.register(Box::new(LOOKUPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LOOKUP_DURATION.clone()))?;
    REGISTRY.register(Box::new(BACKEND_REQUEST_DURATION.clone()))?;
    Ok(())
}

/// `outcome` is `found`, `not_found` or a backend error reason
pub fn increment_lookups_total(outcome: &str) {
    LOOKUPS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_lookup_duration(duration: f64) {
    LOOKUP_DURATION.observe(duration);
}

pub fn observe_backend_request(duration: f64) {
    BACKEND_REQUEST_DURATION.observe(duration);
}
