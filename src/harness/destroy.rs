//! # Destruction Verifier
//!
//! After teardown, confirms that no resource of the case's type recorded in the
//! final state still exists. Every entry is checked and every failure is
//! reported, so one leak never hides another.

use super::checker::ExistenceChecker;
use super::error::HarnessError;
use crate::model::{LifecycleState, ResourceKey};
use crate::observability::metrics;
use crate::provider::LookupOutcome;
use futures::future::join_all;
use std::collections::BTreeSet;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct DestructionVerifier {
    checker: ExistenceChecker,
    resource_type: String,
}

impl DestructionVerifier {
    pub fn new(checker: ExistenceChecker, resource_type: impl Into<String>) -> Self {
        Self {
            checker,
            resource_type: resource_type.into(),
        }
    }

    /// Verify every matching state entry is gone; returns all failures
    ///
    /// Each distinct key is looked up once, however often it was recorded.
    /// `NotFound` is success. A lookup error is a failure, since absence
    /// could not be confirmed.
    pub async fn verify(&self, state: &LifecycleState) -> Vec<HarnessError> {
        let mut failures = Vec::new();
        let mut keys = BTreeSet::new();

        for resource in state.of_type(&self.resource_type) {
            match ResourceKey::from_attributes(&resource.attributes) {
                Ok(key) => {
                    keys.insert(key);
                }
                Err(missing) => failures.push(HarnessError::MissingAttribute {
                    address: resource.address.clone(),
                    missing,
                }),
            }
        }

        let lookups = join_all(keys.iter().map(|key| self.checker.lookup(key))).await;
        for (key, result) in keys.into_iter().zip(lookups) {
            match result {
                Ok(LookupOutcome::NotFound) => {}
                Ok(LookupOutcome::Found(_)) => {
                    error!("Resource leak: collection {} still exists after destroy", key);
                    metrics::increment_leaked_resources_total(&self.resource_type);
                    failures.push(HarnessError::StillExists { key });
                }
                Err(source) => failures.push(HarnessError::Transport { key, source }),
            }
        }

        if failures.is_empty() {
            info!("Destroy verified for {} resources", self.resource_type);
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CollectionAttributes, ResourceAddress, ResourceState};
    use crate::provider::{BackendError, InMemoryCosmos};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const TYPE: &str = "azurerm_cosmos_mongo_collection";

    fn verifier(backend: &InMemoryCosmos) -> DestructionVerifier {
        let checker = ExistenceChecker::new(
            Arc::new(backend.clone()),
            Duration::from_secs(5),
            CancellationToken::new(),
        );
        DestructionVerifier::new(checker, TYPE)
    }

    fn entry(name: &str, key: &ResourceKey) -> ResourceState {
        ResourceState::from_values(
            ResourceAddress::new(TYPE, name),
            &CollectionAttributes::new(key.clone()).to_values(),
        )
    }

    #[tokio::test]
    async fn test_empty_state_passes() {
        let backend = InMemoryCosmos::new();
        assert!(verifier(&backend).verify(&LifecycleState::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_other_types_are_ignored() {
        let backend = InMemoryCosmos::new();
        let group = ResourceState::from_values(
            ResourceAddress::new("azurerm_resource_group", "test"),
            &json!({"name": "acctestRG-1"}),
        );
        let failures = verifier(&backend)
            .verify(&LifecycleState::new(vec![group]))
            .await;
        assert!(failures.is_empty());
        assert_eq!(backend.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_reports_every_leak() {
        let backend = InMemoryCosmos::new();
        let gone = ResourceKey::new("rg", "acc", "db", "gone");
        let leaked_a = ResourceKey::new("rg", "acc", "db", "leaked-a");
        let leaked_b = ResourceKey::new("rg", "acc", "db", "leaked-b");
        backend.upsert(CollectionAttributes::new(leaked_a.clone())).await;
        backend.upsert(CollectionAttributes::new(leaked_b.clone())).await;

        let state = LifecycleState::new(vec![
            entry("a", &leaked_a),
            entry("gone", &gone),
            entry("b", &leaked_b),
        ]);
        let failures = verifier(&backend).verify(&state).await;

        let leaked: Vec<&ResourceKey> = failures
            .iter()
            .filter_map(|f| match f {
                HarnessError::StillExists { key } => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(leaked, vec![&leaked_a, &leaked_b]);
        assert_eq!(failures.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_attributes_and_lookup_errors_fail() {
        let backend = InMemoryCosmos::new();
        backend.fail_next_lookups(1, "throttled").await;
        let broken = ResourceState::from_values(
            ResourceAddress::new(TYPE, "broken"),
            &json!({"name": "coll"}),
        );
        let state = LifecycleState::new(vec![
            broken,
            entry("test", &ResourceKey::new("rg", "acc", "db", "coll")),
        ]);

        let failures = verifier(&backend).verify(&state).await;
        assert_eq!(failures.len(), 2);
        assert!(matches!(failures[0], HarnessError::MissingAttribute { .. }));
        assert!(matches!(
            failures[1],
            HarnessError::Transport {
                source: BackendError::Unavailable(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_repeated_key_is_looked_up_once() {
        let backend = InMemoryCosmos::new();
        let leaked = ResourceKey::new("rg", "acc", "db", "leaked");
        backend.upsert(CollectionAttributes::new(leaked.clone())).await;
        let mut with_ttl = CollectionAttributes::new(leaked.clone());
        with_ttl.default_ttl_seconds = Some(707);

        let state = LifecycleState::new(vec![
            entry("test", &leaked),
            ResourceState::from_values(ResourceAddress::new(TYPE, "test"), &with_ttl.to_values()),
        ]);
        let failures = verifier(&backend).verify(&state).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(backend.lookup_count(), 1);
    }
}
