//! # Azure Mongo Collection Client
//!
//! Point lookups of Cosmos DB Mongo collections through the Azure Resource Manager REST API.
//!
//! This module provides functionality to:
//! - Resolve the ARM endpoint (real or mock)
//! - Acquire tokens with Workload Identity, Managed Identity or a static mock credential
//! - Map ARM collection resources onto harness attributes

pub mod auth;
pub mod client;
pub mod types;

use super::{BackendError, CollectionClient, LookupOutcome};
use crate::config::HarnessConfig;
use crate::constants::ARM_SCOPE;
use crate::model::ResourceKey;
use crate::observability::metrics;
use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_core::credentials::{TokenCredential, TokenRequestOptions};
use reqwest::{Client as ReqwestClient, StatusCode, Url};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, Instrument};

use self::auth::create_credential;
use self::client::{collection_url, construct_endpoint, create_http_client};
use self::types::MongoCollectionGetResults;

/// ARM-backed collection client
pub struct AzureCollectionClient {
    http_client: ReqwestClient,
    credential: Arc<dyn TokenCredential>,
    endpoint: Url,
    subscription_id: String,
}

impl std::fmt::Debug for AzureCollectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCollectionClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

impl AzureCollectionClient {
    /// Create a client from harness configuration
    /// # Errors
    /// Returns an error if the subscription is missing, the endpoint is invalid,
    /// or credential/HTTP client creation fails
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let credential = create_credential(config)?;
        Self::with_credential(config, credential)
    }

    /// Create a client with an explicit credential
    pub fn with_credential(
        config: &HarnessConfig,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self> {
        let subscription_id = config
            .subscription_id
            .clone()
            .context("ARM_SUBSCRIPTION_ID must be set for ARM lookups")?;

        Ok(Self {
            http_client: create_http_client(config)?,
            credential,
            endpoint: construct_endpoint(config)?,
            subscription_id,
        })
    }

    async fn bearer_token(&self) -> Result<String, BackendError> {
        let token = self
            .credential
            .get_token(&[ARM_SCOPE], Some(TokenRequestOptions::default()))
            .await
            .map_err(|e| BackendError::Auth(e.to_string()))?;
        Ok(token.token.secret().to_string())
    }
}

#[async_trait]
impl CollectionClient for AzureCollectionClient {
    async fn get_mongo_collection(
        &self,
        key: &ResourceKey,
    ) -> Result<LookupOutcome, BackendError> {
        let span = tracing::debug_span!(
            "azure.cosmos.mongo_collection.get",
            collection.name = %key.name,
            collection.database = %key.database,
            collection.account = %key.account,
            http.status = tracing::field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let url = collection_url(&self.endpoint, &self.subscription_id, key);
            let token = self.bearer_token().await?;

            let response = self
                .http_client
                .get(url)
                .header("Authorization", format!("Bearer {token}"))
                .send()
                .await?;

            let status = response.status();
            span_clone.record("http.status", status.as_u16());
            metrics::observe_backend_request(start.elapsed().as_secs_f64());

            if status == StatusCode::NOT_FOUND {
                debug!("Collection {} not found", key);
                return Ok(LookupOutcome::NotFound);
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(BackendError::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = response.bytes().await?;
            let results: MongoCollectionGetResults = serde_json::from_slice(&bytes)?;
            Ok(LookupOutcome::Found(results.into_attributes(key)))
        }
        .instrument(span)
        .await
    }
}
