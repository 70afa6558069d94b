//! # Mongo Collection Attributes
//!
//! Backend view of a collection and its conversion to and from state value trees.

use super::key::ResourceKey;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

/// Secondary index on a collection
///
/// `unique` is optional in configuration and defaults to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
}

impl IndexDescriptor {
    /// Index with the uniqueness flag left at its default
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            unique: None,
        }
    }

    /// Index with an explicit uniqueness flag
    pub fn with_unique(key: impl Into<String>, unique: bool) -> Self {
        Self {
            key: key.into(),
            unique: Some(unique),
        }
    }

    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    /// Copy with the default made explicit, as the backend reports it
    pub fn normalized(&self) -> Self {
        Self::with_unique(self.key.clone(), self.is_unique())
    }

    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then(self.is_unique().cmp(&other.is_unique()))
    }
}

/// Attributes of one Mongo collection as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionAttributes {
    pub key: ResourceKey,
    pub default_ttl_seconds: Option<i64>,
    pub shard_key: Option<String>,
    /// Indexes form a set; a new configuration replaces the whole set
    pub indexes: Vec<IndexDescriptor>,
}

impl CollectionAttributes {
    pub fn new(key: ResourceKey) -> Self {
        Self {
            key,
            default_ttl_seconds: None,
            shard_key: None,
            indexes: Vec::new(),
        }
    }

    /// Indexes with defaults made explicit, in canonical order
    pub fn normalized_indexes(&self) -> Vec<IndexDescriptor> {
        let mut indexes: Vec<IndexDescriptor> =
            self.indexes.iter().map(IndexDescriptor::normalized).collect();
        indexes.sort_by(IndexDescriptor::canonical_cmp);
        indexes.dedup();
        indexes
    }

    /// State value tree for this collection (without `id`)
    pub fn to_values(&self) -> Value {
        let mut values = Map::new();
        values.insert("name".into(), json!(self.key.name));
        values.insert("resource_group_name".into(), json!(self.key.resource_group));
        values.insert("account_name".into(), json!(self.key.account));
        values.insert("database_name".into(), json!(self.key.database));
        if let Some(ttl) = self.default_ttl_seconds {
            values.insert("default_ttl_seconds".into(), json!(ttl));
        }
        if let Some(shard_key) = &self.shard_key {
            values.insert("shard_key".into(), json!(shard_key));
        }
        let indexes: Vec<Value> = self
            .normalized_indexes()
            .into_iter()
            .map(|index| json!({ "key": index.key, "unique": index.is_unique() }))
            .collect();
        values.insert("indexes".into(), Value::Array(indexes));
        Value::Object(values)
    }

    /// Read a collection back from an evaluated value tree
    ///
    /// Returns the name of the first missing key attribute on failure.
    pub fn from_values(values: &Value) -> Result<Self, &'static str> {
        let string = |attr: &'static str| {
            values
                .get(attr)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or(attr)
        };

        let key = ResourceKey {
            name: string("name")?,
            resource_group: string("resource_group_name")?,
            account: string("account_name")?,
            database: string("database_name")?,
        };

        let indexes = values
            .get("indexes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let key = item.get("key").and_then(Value::as_str)?;
                        Some(IndexDescriptor {
                            key: key.to_string(),
                            unique: item.get("unique").and_then(Value::as_bool),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            key,
            default_ttl_seconds: values.get("default_ttl_seconds").and_then(Value::as_i64),
            shard_key: values
                .get("shard_key")
                .and_then(Value::as_str)
                .map(str::to_string),
            indexes,
        })
    }
}
