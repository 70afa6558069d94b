//! # Harness Context
//!
//! Process-wide state shared by every lifecycle run: configuration, the
//! backend client, the orchestrator and the cancellation token. Built once at
//! startup and passed to drivers explicitly.

use super::checker::ExistenceChecker;
use super::error::HarnessError;
use crate::config::HarnessConfig;
use crate::constants::LOCAL_SUBSCRIPTION_ID;
use crate::orchestrator::{LocalOrchestrator, Orchestrator, TerraformOrchestrator};
use crate::provider::{AzureCollectionClient, CollectionClient, InMemoryCosmos};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug)]
pub struct HarnessContext {
    config: HarnessConfig,
    client: Arc<dyn CollectionClient>,
    orchestrator: Arc<dyn Orchestrator>,
    cancel: CancellationToken,
}

impl HarnessContext {
    pub fn init(
        config: HarnessConfig,
        client: Arc<dyn CollectionClient>,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            client,
            orchestrator,
            cancel: CancellationToken::new(),
        })
    }

    /// Context for live runs: ARM lookups and the terraform binary
    ///
    /// # Errors
    /// Fails the precheck when required variables are missing, before any
    /// client is created.
    pub fn live(config: HarnessConfig) -> Result<Arc<Self>> {
        Self::precheck(&config)?;
        let client: Arc<dyn CollectionClient> = Arc::new(AzureCollectionClient::new(&config)?);
        let orchestrator: Arc<dyn Orchestrator> = Arc::new(TerraformOrchestrator::new(&config)?);
        info!(
            "Live acceptance context ready (location: {}, endpoint: {})",
            config.location, config.arm_endpoint
        );
        Ok(Self::init(config, client, orchestrator))
    }

    /// Context backed entirely by an in-memory store
    pub fn local(config: HarnessConfig, backend: InMemoryCosmos) -> Arc<Self> {
        let subscription_id = config
            .subscription_id
            .clone()
            .unwrap_or_else(|| LOCAL_SUBSCRIPTION_ID.to_string());
        let orchestrator: Arc<dyn Orchestrator> =
            Arc::new(LocalOrchestrator::new(backend.clone(), subscription_id));
        Self::init(config, Arc::new(backend), orchestrator)
    }

    /// Refuse live runs without the acceptance gate, subscription and location
    pub fn precheck(config: &HarnessConfig) -> Result<(), HarnessError> {
        let missing = config.missing_live_requirements();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Precheck { missing })
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> Arc<dyn Orchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn client(&self) -> Arc<dyn CollectionClient> {
        Arc::clone(&self.client)
    }

    pub fn checker(&self) -> ExistenceChecker {
        ExistenceChecker::new(
            Arc::clone(&self.client),
            self.config.lookup_timeout(),
            self.cancel.clone(),
        )
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel in-flight steps and lookups
    ///
    /// Destroy phases already running still complete.
    pub fn teardown(&self) {
        if !self.cancel.is_cancelled() {
            info!("Tearing down acceptance context");
            self.cancel.cancel();
        }
    }
}
