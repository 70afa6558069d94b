//! # ARM Credentials
//!
//! Picks the token credential used for collection lookups. Mock ARM servers get
//! a fixed bearer token so no Azure login is attempted.

use crate::config::{AzureAuthConfig, HarnessConfig};
use anyhow::{Context, Result};
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_identity::{
    ManagedIdentityCredential, WorkloadIdentityCredential, WorkloadIdentityCredentialOptions,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Bearer token presented to mock ARM endpoints
pub const MOCK_BEARER_TOKEN: &str = "test-token";

/// Credential handing out one fixed token, valid for an hour from each request
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        use typespec_client_core::time::{Duration, OffsetDateTime};

        Ok(AccessToken::new(
            Secret::new(self.token.clone()),
            OffsetDateTime::now_utc() + Duration::hours(1),
        ))
    }
}

/// Credential for ARM lookups
///
/// `ACCTEST_MOCK_AUTH` wins over everything else. Otherwise Workload Identity
/// is used when a client ID is configured, and Managed Identity when not.
pub fn create_credential(config: &HarnessConfig) -> Result<Arc<dyn TokenCredential>> {
    if config.mock_auth {
        debug!("Using static bearer token for mock ARM endpoint");
        return Ok(Arc::new(StaticTokenCredential::new(MOCK_BEARER_TOKEN)));
    }

    match &config.auth {
        Some(AzureAuthConfig::WorkloadIdentity { client_id }) => {
            info!("ARM lookups authenticate with Workload Identity (client {})", client_id);
            let options = WorkloadIdentityCredentialOptions {
                client_id: Some(client_id.clone()),
                ..Default::default()
            };
            WorkloadIdentityCredential::new(Some(options))
                .context("Failed to create WorkloadIdentityCredential")
                .map(|credential| credential as Arc<dyn TokenCredential>)
        }
        None => {
            info!("ARM_CLIENT_ID not set, ARM lookups authenticate with Managed Identity");
            ManagedIdentityCredential::new(None)
                .context("Failed to create ManagedIdentityCredential")
                .map(|credential| credential as Arc<dyn TokenCredential>)
        }
    }
}
