//! # Local Orchestrator
//!
//! Applies rendered configuration against an [`InMemoryCosmos`] without any
//! external tooling. Understands the configuration subset the renderer emits
//! and the four resource types the collection scenarios declare.

use super::{Operation, Orchestrator, OrchestratorError, Session};
use crate::constants::{
    COSMOS_ACCOUNT_TYPE, MONGO_COLLECTION_TYPE, MONGO_DATABASE_TYPE, RESOURCE_GROUP_TYPE,
};
use crate::model::{
    CollectionAttributes, LifecycleState, ResourceAddress, ResourceKey, ResourceState,
};
use crate::provider::InMemoryCosmos;
use crate::render::{parse_config, AttrValue, Body, BodyItem};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Orchestrator backed by the in-memory store
#[derive(Debug, Clone)]
pub struct LocalOrchestrator {
    backend: InMemoryCosmos,
    subscription_id: String,
}

impl LocalOrchestrator {
    pub fn new(backend: InMemoryCosmos, subscription_id: impl Into<String>) -> Self {
        Self {
            backend,
            subscription_id: subscription_id.into(),
        }
    }
}

#[async_trait]
impl Orchestrator for LocalOrchestrator {
    async fn begin(&self, run_id: &str) -> Result<Box<dyn Session>, OrchestratorError> {
        debug!("Starting local session {}", run_id);
        Ok(Box::new(LocalSession {
            backend: self.backend.clone(),
            subscription_id: self.subscription_id.clone(),
            state: LifecycleState::default(),
        }))
    }
}

#[derive(Debug)]
struct LocalSession {
    backend: InMemoryCosmos,
    subscription_id: String,
    state: LifecycleState,
}

impl LocalSession {
    fn collection_keys(state: &LifecycleState) -> BTreeSet<ResourceKey> {
        state
            .of_type(MONGO_COLLECTION_TYPE)
            .filter_map(|r| ResourceKey::from_attributes(&r.attributes).ok())
            .collect()
    }

    fn computed_id(&self, address: &ResourceAddress, values: &Value) -> Result<String, OrchestratorError> {
        let get = |attr: &str| {
            values
                .get(attr)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    OrchestratorError::failed(
                        Operation::Apply,
                        format!("{address}: required attribute '{attr}' is not set"),
                    )
                })
        };
        let sub = &self.subscription_id;

        match address.resource_type.as_str() {
            RESOURCE_GROUP_TYPE => Ok(format!("/subscriptions/{sub}/resourceGroups/{}", get("name")?)),
            COSMOS_ACCOUNT_TYPE => Ok(format!(
                "/subscriptions/{sub}/resourceGroups/{}/providers/Microsoft.DocumentDB/databaseAccounts/{}",
                get("resource_group_name")?,
                get("name")?
            )),
            MONGO_DATABASE_TYPE => Ok(format!(
                "/subscriptions/{sub}/resourceGroups/{}/providers/Microsoft.DocumentDB/databaseAccounts/{}/apiType/mongodb/databases/{}",
                get("resource_group_name")?,
                get("account_name")?,
                get("name")?
            )),
            other => Err(OrchestratorError::failed(
                Operation::Apply,
                format!("resource type '{other}' is not supported locally"),
            )),
        }
    }
}

#[async_trait]
impl Session for LocalSession {
    async fn apply(&mut self, config: &str) -> Result<LifecycleState, OrchestratorError> {
        let document = parse_config(config)?;

        let mut evaluated: BTreeMap<ResourceAddress, Value> = BTreeMap::new();
        let mut resources = Vec::with_capacity(document.resources.len());
        let mut collections = Vec::new();

        for block in &document.resources {
            let mut values = evaluate_body(&block.body, &evaluated).map_err(|message| {
                OrchestratorError::failed(Operation::Apply, format!("{}: {message}", block.address))
            })?;

            if block.address.resource_type == MONGO_COLLECTION_TYPE {
                let attributes = CollectionAttributes::from_values(&values).map_err(|attr| {
                    OrchestratorError::failed(
                        Operation::Apply,
                        format!("{}: required attribute '{attr}' is not set", block.address),
                    )
                })?;
                values = attributes.to_values();
                values["id"] = json!(attributes.key.resource_id(&self.subscription_id));
                collections.push(attributes);
            } else {
                let id = self.computed_id(&block.address, &values)?;
                values["id"] = json!(id);
            }

            resources.push(ResourceState::from_values(block.address.clone(), &values));
            evaluated.insert(block.address.clone(), values);
        }

        // Indexes and other attributes are replaced wholesale, never merged
        let applied_keys: BTreeSet<ResourceKey> =
            collections.iter().map(|c| c.key.clone()).collect();
        for stale in Self::collection_keys(&self.state).difference(&applied_keys) {
            info!("Removing collection {} no longer in configuration", stale);
            self.backend.delete(stale).await;
        }
        for attributes in collections {
            self.backend.upsert(attributes).await;
        }

        self.state = LifecycleState::new(resources);
        Ok(self.state.clone())
    }

    async fn import(
        &mut self,
        _config: &str,
        address: &ResourceAddress,
        id: &str,
    ) -> Result<ResourceState, OrchestratorError> {
        if address.resource_type != MONGO_COLLECTION_TYPE {
            return Err(OrchestratorError::failed(
                Operation::Import,
                format!("resource type '{}' cannot be imported locally", address.resource_type),
            ));
        }

        let key = ResourceKey::parse_resource_id(id)
            .map_err(|e| OrchestratorError::failed(Operation::Import, e.to_string()))?;
        let attributes = self.backend.get(&key).await.ok_or_else(|| {
            OrchestratorError::failed(
                Operation::Import,
                format!("cannot import non-existent remote object {key}"),
            )
        })?;

        let mut values = attributes.to_values();
        values["id"] = json!(id);
        Ok(ResourceState::from_values(address.clone(), &values))
    }

    async fn destroy(&mut self, _config: &str) -> Result<(), OrchestratorError> {
        for key in Self::collection_keys(&self.state) {
            self.backend.delete(&key).await;
        }
        self.state = LifecycleState::default();
        Ok(())
    }

    async fn state(&mut self) -> Result<LifecycleState, OrchestratorError> {
        Ok(self.state.clone())
    }
}

/// Evaluate a block body into a value tree, resolving references against
/// resources evaluated earlier in the same configuration
fn evaluate_body(body: &Body, evaluated: &BTreeMap<ResourceAddress, Value>) -> Result<Value, String> {
    let mut out = Map::new();
    for item in &body.items {
        match item {
            BodyItem::Attribute { name, value } => {
                let resolved = match value {
                    AttrValue::String(s) => json!(s),
                    AttrValue::Int(n) => json!(n),
                    AttrValue::Bool(b) => json!(b),
                    AttrValue::Reference(reference) => evaluated
                        .get(&reference.address)
                        .and_then(|values| values.get(&reference.attribute))
                        .cloned()
                        .ok_or_else(|| format!("reference to unknown attribute '{reference}'"))?,
                };
                out.insert(name.clone(), resolved);
            }
            BodyItem::Block { name, body } => {
                let nested = evaluate_body(body, evaluated)?;
                match out.entry(name.clone()).or_insert_with(|| Value::Array(Vec::new())) {
                    Value::Array(items) => items.push(nested),
                    _ => return Err(format!("'{name}' is both an attribute and a block")),
                }
            }
        }
    }
    Ok(Value::Object(out))
}
