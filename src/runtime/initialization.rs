//! # Initialization
//!
//! Harness initialization: rustls setup, tracing, metrics registration and
//! construction of the harness context for live or local runs.

use crate::config::HarnessConfig;
use crate::constants::DEFAULT_LOG_FILTER;
use crate::harness::{HarnessContext, LifecycleDriver};
use crate::observability;
use crate::provider::InMemoryCosmos;
use anyhow::Result;
use std::sync::{Arc, Once};
use tracing::{debug, info, warn};

static METRICS_REGISTERED: Once = Once::new();

/// Where lifecycle runs apply their configurations
#[derive(Debug, Clone)]
pub enum Backend {
    /// Terraform plus ARM lookups; requires the live precheck to pass
    Live,
    /// Local orchestrator over an in-memory store
    Local(InMemoryCosmos),
}

/// Initialization result containing everything a lifecycle run needs
#[derive(Debug)]
pub struct InitializationResult {
    pub context: Arc<HarnessContext>,
    pub driver: LifecycleDriver,
}

/// Install the ring crypto provider for rustls
///
/// Safe to call repeatedly; only the first call installs.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Install the tracing subscriber
///
/// Uses `RUST_LOG` when set. Later calls are no-ops, so tests may call it freely.
pub fn init_tracing() {
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .try_init();
    if let Err(e) = result {
        debug!("Tracing subscriber already initialized: {}", e);
    }
}

/// Register harness metrics exactly once per process
pub fn init_metrics() {
    METRICS_REGISTERED.call_once(|| {
        if let Err(e) = observability::metrics::register_metrics() {
            warn!("Failed to register metrics: {}", e);
        }
    });
}

/// Initialize the harness runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - Harness context creation (live precheck included)
pub fn initialize(config: HarnessConfig, backend: Backend) -> Result<InitializationResult> {
    install_crypto_provider();
    init_tracing();
    init_metrics();

    info!("Starting Cosmos Mongo collection acceptance harness");

    let context = match backend {
        Backend::Live => HarnessContext::live(config)?,
        Backend::Local(store) => {
            info!("Using local orchestrator with in-memory backend");
            HarnessContext::local(config, store)
        }
    };

    Ok(InitializationResult {
        driver: LifecycleDriver::new(Arc::clone(&context)),
        context,
    })
}
