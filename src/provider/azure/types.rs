//! # ARM Mongo Collection Types
//!
//! Response shape of `GET .../mongodbDatabases/{db}/collections/{name}` and its
//! mapping onto [`CollectionAttributes`].
//!
//! API Reference: https://learn.microsoft.com/en-us/rest/api/cosmos-db-resource-provider/mongo-db-resources/get-mongo-db-collection

use crate::model::{CollectionAttributes, IndexDescriptor, ResourceKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the index Cosmos uses to carry the collection TTL
pub const TTL_INDEX_KEY: &str = "_ts";

/// Key of the implicit primary index
pub const ID_INDEX_KEY: &str = "_id";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MongoCollectionGetResults {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Option<MongoCollectionProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MongoCollectionProperties {
    #[serde(default)]
    pub resource: Option<MongoCollectionResource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoCollectionResource {
    #[serde(default)]
    pub id: String,
    /// Shard key name to kind ("Hash")
    #[serde(default)]
    pub shard_key: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub indexes: Vec<MongoIndex>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MongoIndex {
    #[serde(default)]
    pub key: Option<MongoIndexKeys>,
    #[serde(default)]
    pub options: Option<MongoIndexOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MongoIndexKeys {
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoIndexOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
}

impl MongoCollectionGetResults {
    /// Map the ARM resource onto collection attributes
    ///
    /// The `_ts` index carries the TTL, the first shard key entry is the shard
    /// key, and the implicit `_id` index is not reported.
    pub fn into_attributes(self, key: &ResourceKey) -> CollectionAttributes {
        let mut attributes = CollectionAttributes::new(key.clone());
        let Some(resource) = self.properties.and_then(|p| p.resource) else {
            return attributes;
        };

        attributes.shard_key = resource
            .shard_key
            .and_then(|keys| keys.into_keys().next());

        for index in resource.indexes {
            let keys = index.key.map(|k| k.keys).unwrap_or_default();
            let options = index.options.unwrap_or_default();
            for name in keys {
                match name.as_str() {
                    TTL_INDEX_KEY => {
                        attributes.default_ttl_seconds = options.expire_after_seconds;
                    }
                    ID_INDEX_KEY => {}
                    _ => attributes.indexes.push(IndexDescriptor::with_unique(
                        name,
                        options.unique.unwrap_or(false),
                    )),
                }
            }
        }

        attributes
    }
}
