//! # Lifecycle State
//!
//! The record of applied resources and their flattened attributes, as reported
//! by the orchestrator after each step.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Address of a resource block in a configuration, written `type.name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceAddress {
    pub resource_type: String,
    pub name: String,
}

impl ResourceAddress {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

impl FromStr for ResourceAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((resource_type, name))
                if !resource_type.is_empty() && !name.is_empty() && !name.contains('.') =>
            {
                Ok(Self::new(resource_type, name))
            }
            _ => Err(format!("invalid resource address '{s}', expected 'type.name'")),
        }
    }
}

/// One resource recorded in lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState {
    pub address: ResourceAddress,
    /// Flattened attributes (`indexes.#`, `indexes.0.key`, ...)
    pub attributes: BTreeMap<String, String>,
}

impl ResourceState {
    /// Build state from a value tree; `id` is read from the tree itself
    pub fn from_values(address: ResourceAddress, values: &Value) -> Self {
        Self {
            address,
            attributes: flatten_values(values),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes
            .get("id")
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Ordered record of every resource the orchestrator manages for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleState {
    pub resources: Vec<ResourceState>,
}

impl LifecycleState {
    pub fn new(resources: Vec<ResourceState>) -> Self {
        Self { resources }
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&ResourceState> {
        self.resources.iter().find(|r| &r.address == address)
    }

    pub fn of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a ResourceState> {
        self.resources
            .iter()
            .filter(move |r| r.address.resource_type == resource_type)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Append every resource of `other` not already recorded verbatim
    ///
    /// Keeps earlier versions of a resource alongside later ones, so the
    /// result covers every key a run has touched.
    pub fn record(&mut self, other: &LifecycleState) {
        for resource in &other.resources {
            if !self.resources.contains(resource) {
                self.resources.push(resource.clone());
            }
        }
    }
}

/// Flatten a value tree into dotted attribute keys
///
/// Lists record their length under `<key>.#` and maps theirs under `<key>.%`.
/// List elements are sorted by their JSON text so set-typed attributes compare
/// equal regardless of the order the backend returns them in. Nulls are dropped.
pub fn flatten_values(values: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = values {
        for (key, value) in map {
            flatten_into(key, value, &mut out);
        }
    }
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Array(items) => {
            let mut sorted: Vec<&Value> = items.iter().collect();
            sorted.sort_by_cached_key(|item| item.to_string());
            out.insert(format!("{prefix}.#"), sorted.len().to_string());
            for (i, item) in sorted.into_iter().enumerate() {
                flatten_into(&format!("{prefix}.{i}"), item, out);
            }
        }
        Value::Object(map) => {
            out.insert(format!("{prefix}.%"), map.len().to_string());
            for (key, item) in map {
                flatten_into(&format!("{prefix}.{key}"), item, out);
            }
        }
    }
}
