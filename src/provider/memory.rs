//! # In-Memory Cosmos Backend
//!
//! Collection store used by the local orchestrator and the harness tests.
//! Supports injected lookup failures, artificial latency and dropped deletes
//! so every failure path of the harness can be exercised without Azure.

use super::{BackendError, CollectionClient, LookupOutcome};
use crate::model::{CollectionAttributes, ResourceKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Faults {
    failing_lookups: usize,
    message: String,
    latency: Option<Duration>,
}

/// In-memory collection store
#[derive(Debug, Clone, Default)]
pub struct InMemoryCosmos {
    collections: Arc<RwLock<HashMap<ResourceKey, CollectionAttributes>>>,
    faults: Arc<RwLock<Faults>>,
    ignore_deletes: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
}

impl InMemoryCosmos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or fully replace a collection
    pub async fn upsert(&self, attributes: CollectionAttributes) {
        debug!("In-memory upsert of collection {}", attributes.key);
        self.collections
            .write()
            .await
            .insert(attributes.key.clone(), attributes);
    }

    /// Delete a collection; returns whether it existed
    pub async fn delete(&self, key: &ResourceKey) -> bool {
        if self.ignore_deletes.load(Ordering::Relaxed) {
            debug!("In-memory delete of {} dropped", key);
            return self.collections.read().await.contains_key(key);
        }
        self.collections.write().await.remove(key).is_some()
    }

    pub async fn get(&self, key: &ResourceKey) -> Option<CollectionAttributes> {
        self.collections.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.collections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.collections.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.collections.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Fail the next `count` lookups with [`BackendError::Unavailable`]
    pub async fn fail_next_lookups(&self, count: usize, message: impl Into<String>) {
        let mut faults = self.faults.write().await;
        faults.failing_lookups = count;
        faults.message = message.into();
    }

    /// Delay every lookup by `latency`
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.faults.write().await.latency = latency;
    }

    /// Make deletes report success without removing anything (simulated leak)
    pub fn set_ignore_deletes(&self, ignore: bool) {
        self.ignore_deletes.store(ignore, Ordering::Relaxed);
    }

    /// Number of lookups served, including failed ones
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CollectionClient for InMemoryCosmos {
    async fn get_mongo_collection(
        &self,
        key: &ResourceKey,
    ) -> Result<LookupOutcome, BackendError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        let latency = {
            let mut faults = self.faults.write().await;
            if faults.failing_lookups > 0 {
                faults.failing_lookups -= 1;
                return Err(BackendError::Unavailable(faults.message.clone()));
            }
            faults.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        Ok(match self.get(key).await {
            Some(attributes) => LookupOutcome::Found(attributes),
            None => LookupOutcome::NotFound,
        })
    }
}
