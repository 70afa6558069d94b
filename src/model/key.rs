//! # Resource Key
//!
//! Composite identifier of one Mongo collection and its ARM resource ID form.

use crate::constants::KEY_ATTRIBUTES;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Composite identifier locating one remote Mongo collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub resource_group: String,
    pub account: String,
    pub database: String,
    pub name: String,
}

/// Resource ID that does not address a Mongo collection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid Mongo collection resource ID '{id}': {reason}")]
pub struct ResourceIdError {
    pub id: String,
    pub reason: String,
}

impl ResourceKey {
    pub fn new(
        resource_group: impl Into<String>,
        account: impl Into<String>,
        database: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            account: account.into(),
            database: database.into(),
            name: name.into(),
        }
    }

    /// Extract the key from flattened state attributes
    ///
    /// Returns the names of every missing (or empty) key attribute on failure.
    pub fn from_attributes(
        attributes: &BTreeMap<String, String>,
    ) -> Result<Self, Vec<&'static str>> {
        let missing: Vec<&'static str> = KEY_ATTRIBUTES
            .iter()
            .copied()
            .filter(|attr| attributes.get(*attr).is_none_or(String::is_empty))
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let get = |attr: &str| attributes.get(attr).cloned().unwrap_or_default();
        Ok(Self {
            resource_group: get("resource_group_name"),
            account: get("account_name"),
            database: get("database_name"),
            name: get("name"),
        })
    }

    /// ARM resource ID in the form used for import
    pub fn resource_id(&self, subscription_id: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DocumentDB/databaseAccounts/{}/apiType/mongodb/databases/{}/collections/{}",
            subscription_id, self.resource_group, self.account, self.database, self.name
        )
    }

    /// Parse an ARM resource ID back into a key
    ///
    /// Accepts both the `apiType/mongodb/databases` form and the newer
    /// `mongodbDatabases` form.
    pub fn parse_resource_id(id: &str) -> Result<Self, ResourceIdError> {
        let err = |reason: &str| ResourceIdError {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = id.trim().trim_start_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.len() % 2 != 0 {
            return Err(err("expected an even number of path segments"));
        }

        let mut components: BTreeMap<&str, &str> = BTreeMap::new();
        for pair in segments.chunks(2) {
            if pair[1].is_empty() {
                return Err(err(&format!("segment '{}' has no value", pair[0])));
            }
            components.insert(pair[0], pair[1]);
        }

        let lookup = |segment: &str| {
            components
                .get(segment)
                .map(|v| (*v).to_string())
                .ok_or_else(|| err(&format!("missing '{segment}' segment")))
        };

        let database = lookup("databases").or_else(|_| lookup("mongodbDatabases"))?;
        Ok(Self {
            resource_group: lookup("resourceGroups")?,
            account: lookup("databaseAccounts")?,
            database,
            name: lookup("collections")?,
        })
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' (resource group: '{}', account: '{}', database: '{}')",
            self.name, self.resource_group, self.account, self.database
        )
    }
}
