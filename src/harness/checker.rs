//! # Existence Checker
//!
//! Confirms a collection recorded in lifecycle state really exists in the
//! backend. Every lookup is bounded by the lookup timeout and the harness
//! cancellation token.

use super::error::HarnessError;
use crate::model::{CollectionAttributes, LifecycleState, ResourceAddress, ResourceKey};
use crate::observability::metrics;
use crate::provider::{BackendError, CollectionClient, LookupOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};

#[derive(Debug, Clone)]
pub struct ExistenceChecker {
    client: Arc<dyn CollectionClient>,
    lookup_timeout: Duration,
    cancel: CancellationToken,
}

impl ExistenceChecker {
    pub fn new(
        client: Arc<dyn CollectionClient>,
        lookup_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            lookup_timeout,
            cancel,
        }
    }

    /// Single bounded lookup
    ///
    /// Timeout and cancellation surface as [`BackendError`]s, never as `NotFound`.
    pub async fn lookup(&self, key: &ResourceKey) -> Result<LookupOutcome, BackendError> {
        let span = tracing::info_span!(
            "cosmos.mongo.collection.lookup",
            collection.name = %key.name,
            collection.database = %key.database,
            collection.account = %key.account,
            collection.resource_group = %key.resource_group,
            lookup.outcome = tracing::field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        let result = async {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => Err(BackendError::Cancelled),
                outcome = tokio::time::timeout(
                    self.lookup_timeout,
                    self.client.get_mongo_collection(key),
                ) => outcome.unwrap_or(Err(BackendError::Timeout(self.lookup_timeout))),
            }
        }
        .instrument(span)
        .await;

        let outcome = match &result {
            Ok(LookupOutcome::Found(_)) => "found",
            Ok(LookupOutcome::NotFound) => "not_found",
            Err(e) => e.as_str(),
        };
        span_clone.record("lookup.outcome", outcome);
        metrics::increment_lookups_total(outcome);
        metrics::observe_lookup_duration(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!("Lookup of collection {} failed: {}", key, e);
        } else {
            debug!("Lookup of collection {}: {}", key, outcome);
        }
        result
    }

    /// Check that the collection at `address` is in state and exists remotely
    pub async fn check(
        &self,
        state: &LifecycleState,
        address: &ResourceAddress,
    ) -> Result<CollectionAttributes, HarnessError> {
        let resource = state
            .get(address)
            .ok_or_else(|| HarnessError::ResourceNotInState(address.clone()))?;
        let key = ResourceKey::from_attributes(&resource.attributes).map_err(|missing| {
            HarnessError::MissingAttribute {
                address: address.clone(),
                missing,
            }
        })?;

        match self.lookup(&key).await {
            Ok(LookupOutcome::Found(attributes)) => Ok(attributes),
            Ok(LookupOutcome::NotFound) => Err(HarnessError::NotFound { key }),
            Err(source) => Err(HarnessError::Transport { key, source }),
        }
    }
}
