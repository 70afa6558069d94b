//! # ARM Client Creation
//!
//! Handles endpoint resolution and creation of the HTTP client used for lookups.

use crate::config::HarnessConfig;
use crate::constants::MONGO_COLLECTION_API_VERSION;
use crate::model::ResourceKey;
use anyhow::{Context, Result};
use reqwest::{Client as ReqwestClient, Url};
use tracing::info;

/// Parse and validate the ARM endpoint
/// A non-default endpoint is logged since it usually points at a mock server
pub fn construct_endpoint(config: &HarnessConfig) -> Result<Url> {
    let endpoint = Url::parse(&config.arm_endpoint)
        .with_context(|| format!("Invalid ARM endpoint: {}", config.arm_endpoint))?;

    if endpoint.cannot_be_a_base() {
        return Err(anyhow::anyhow!(
            "ARM endpoint cannot carry a path: {}",
            config.arm_endpoint
        ));
    }

    if config.arm_endpoint != crate::constants::DEFAULT_ARM_ENDPOINT {
        info!("Routing ARM lookups to {}", endpoint);
    }

    Ok(endpoint)
}

/// Create the HTTP client with the configured lookup deadline
pub fn create_http_client(config: &HarnessConfig) -> Result<ReqwestClient> {
    ReqwestClient::builder()
        .timeout(config.lookup_timeout())
        .build()
        .context("Failed to create HTTP client")
}

/// Full lookup URL for a collection
///
/// Path segments are percent-encoded by `Url`.
pub fn collection_url(endpoint: &Url, subscription_id: &str, key: &ResourceKey) -> Url {
    let mut url = endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend([
            "subscriptions",
            subscription_id,
            "resourceGroups",
            key.resource_group.as_str(),
            "providers",
            "Microsoft.DocumentDB",
            "databaseAccounts",
            key.account.as_str(),
            "mongodbDatabases",
            key.database.as_str(),
            "collections",
            key.name.as_str(),
        ]);
    }
    url.query_pairs_mut()
        .append_pair("api-version", MONGO_COLLECTION_API_VERSION);
    url
}
