//! # Harness Metrics
//!
//! Metrics for lifecycle runs: run results, step results and leaked resources.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounterVec};
use std::sync::LazyLock;

static RUNS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cosmos_acctest_runs_total",
            "Total number of lifecycle runs by result",
        ),
        &["result"],
    )
    .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cosmos_acctest_run_duration_seconds",
            "Duration of lifecycle runs in seconds, teardown included",
        )
        .buckets(vec![1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static STEPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cosmos_acctest_steps_total",
            "Total number of lifecycle steps by kind and result",
        ),
        &["kind", "result"],
    )
    .expect("Failed to create STEPS_TOTAL metric - this should never happen")
});

static LEAKED_RESOURCES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cosmos_acctest_leaked_resources_total",
            "Total number of resources still present after destroy",
        ),
        &["resource_type"],
    )
    .expect("Failed to create LEAKED_RESOURCES_TOTAL metric - this should never happen")
});

pub(crate) fn register_harness_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_DURATION.clone()))?;
    REGISTRY.register(Box::new(STEPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LEAKED_RESOURCES_TOTAL.clone()))?;
    Ok(())
}

/// Record a finished run; `result` is `passed` or a failure category
pub fn increment_runs_total(result: &str) {
    RUNS_TOTAL.with_label_values(&[result]).inc();
}

pub fn observe_run_duration(duration: f64) {
    RUN_DURATION.observe(duration);
}

pub fn increment_steps_total(kind: &str, result: &str) {
    STEPS_TOTAL.with_label_values(&[kind, result]).inc();
}

pub fn increment_leaked_resources_total(resource_type: &str) {
    LEAKED_RESOURCES_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}
