//! # Mongo Collection Scenarios
//!
//! Named configurations for the collection lifecycle cases, built from typed
//! resource specs rather than format strings.

use super::document::{AttrValue, Body, ConfigDocument, ResourceBlock};
use crate::constants::{
    COSMOS_ACCOUNT_TYPE, MONGO_COLLECTION_TYPE, MONGO_DATABASE_TYPE, RESOURCE_GROUP_TYPE,
    TEST_RESOURCE_NAME,
};
use crate::model::{IndexDescriptor, ResourceAddress};
use std::fmt;
use std::str::FromStr;

/// A named collection configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Collection with only its required attributes
    Basic,
    /// TTL, shard key and three non-unique indexes
    Complete,
    /// Changed TTL, shard key and index set relative to `Complete`
    Updated,
    /// Fixed names inside a pre-existing account
    Debug,
    /// Second fixed-name fixture with a single index
    Debug2,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::Basic,
        Scenario::Complete,
        Scenario::Updated,
        Scenario::Debug,
        Scenario::Debug2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Basic => "basic",
            Scenario::Complete => "complete",
            Scenario::Updated => "updated",
            Scenario::Debug => "debug",
            Scenario::Debug2 => "debug2",
        }
    }

    /// Build the configuration document for suffix `ri` in `location`
    pub fn document(&self, ri: i64, location: &str) -> ConfigDocument {
        match self {
            Scenario::Basic => with_parent_database(ri, location, CollectionSpec::child_of_database(ri)),
            Scenario::Complete => with_parent_database(
                ri,
                location,
                CollectionSpec {
                    default_ttl_seconds: Some(707),
                    shard_key: Some("seven".to_string()),
                    indexes: vec![
                        IndexDescriptor::new("seven"),
                        IndexDescriptor::with_unique("day", false),
                        IndexDescriptor::with_unique("fool", false),
                    ],
                    ..CollectionSpec::child_of_database(ri)
                },
            ),
            Scenario::Updated => with_parent_database(
                ri,
                location,
                CollectionSpec {
                    default_ttl_seconds: Some(70707),
                    shard_key: Some("days".to_string()),
                    indexes: vec![
                        IndexDescriptor::with_unique("seven", false),
                        IndexDescriptor::with_unique("day", true),
                        IndexDescriptor::new("fools"),
                    ],
                    ..CollectionSpec::child_of_database(ri)
                },
            ),
            Scenario::Debug => ConfigDocument::new(vec![CollectionSpec {
                default_ttl_seconds: Some(10000),
                indexes: vec![
                    IndexDescriptor::with_unique("seven", false),
                    IndexDescriptor::new("seven11"),
                ],
                ..CollectionSpec::fixed("seven-day-tables-cola", "SevenDayDBs22")
            }
            .into_block()]),
            Scenario::Debug2 => ConfigDocument::new(vec![CollectionSpec {
                indexes: vec![IndexDescriptor::with_unique("seven", false)],
                ..CollectionSpec::fixed("seven-day-tables-more123ugg", "SevenDayDBs")
            }
            .into_block()]),
        }
    }

    /// Configuration text for suffix `ri` in `location`
    pub fn render(&self, ri: i64, location: &str) -> String {
        self.document(ri, location).render()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Scenario::ALL.iter().map(Scenario::as_str).collect();
                format!("unknown scenario '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Address of the collection every scenario declares
pub fn collection_address() -> ResourceAddress {
    ResourceAddress::new(MONGO_COLLECTION_TYPE, TEST_RESOURCE_NAME)
}

/// Name shared by the account, database and collection for suffix `ri`
pub fn acctest_name(ri: i64) -> String {
    format!("acctest-{ri}")
}

/// Typed `azurerm_cosmos_mongo_collection` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub resource_group_name: AttrValue,
    pub account_name: AttrValue,
    pub database_name: AttrValue,
    pub default_ttl_seconds: Option<i64>,
    pub shard_key: Option<String>,
    pub indexes: Vec<IndexDescriptor>,
}

impl CollectionSpec {
    /// Collection whose coordinates come from the rendered parent database
    pub fn child_of_database(ri: i64) -> Self {
        let database = ResourceAddress::new(MONGO_DATABASE_TYPE, TEST_RESOURCE_NAME);
        Self {
            name: acctest_name(ri),
            resource_group_name: AttrValue::reference(&database, "resource_group_name"),
            account_name: AttrValue::reference(&database, "account_name"),
            database_name: AttrValue::reference(&database, "name"),
            default_ttl_seconds: None,
            shard_key: None,
            indexes: Vec::new(),
        }
    }

    /// Collection with literal coordinates in the long-lived debug account
    pub fn fixed(name: &str, database: &str) -> Self {
        Self {
            name: name.to_string(),
            resource_group_name: AttrValue::string("kt-cosmos-201905"),
            account_name: AttrValue::string("kt-cosmos-mongo"),
            database_name: AttrValue::string(database),
            default_ttl_seconds: None,
            shard_key: None,
            indexes: Vec::new(),
        }
    }

    pub fn into_block(self) -> ResourceBlock {
        let mut body = Body::new()
            .attr("name", AttrValue::String(self.name))
            .attr("resource_group_name", self.resource_group_name)
            .attr("account_name", self.account_name)
            .attr("database_name", self.database_name)
            .opt_attr("default_ttl_seconds", self.default_ttl_seconds.map(AttrValue::Int))
            .opt_attr("shard_key", self.shard_key.map(AttrValue::String));
        for index in self.indexes {
            body = body.block(
                "indexes",
                Body::new()
                    .attr("key", AttrValue::String(index.key))
                    .opt_attr("unique", index.unique.map(AttrValue::Bool)),
            );
        }
        ResourceBlock::new(collection_address(), body)
    }
}

/// Resource group, MongoDB-kind account and database the collection lives in
pub fn mongo_database_prerequisites(ri: i64, location: &str) -> Vec<ResourceBlock> {
    let group = ResourceAddress::new(RESOURCE_GROUP_TYPE, TEST_RESOURCE_NAME);
    let account = ResourceAddress::new(COSMOS_ACCOUNT_TYPE, TEST_RESOURCE_NAME);

    vec![
        ResourceBlock::new(
            group.clone(),
            Body::new()
                .attr("name", AttrValue::String(format!("acctestRG-{ri}")))
                .attr("location", AttrValue::string(location)),
        ),
        ResourceBlock::new(
            account.clone(),
            Body::new()
                .attr("name", AttrValue::String(acctest_name(ri)))
                .attr("location", AttrValue::reference(&group, "location"))
                .attr("resource_group_name", AttrValue::reference(&group, "name"))
                .attr("offer_type", AttrValue::string("Standard"))
                .attr("kind", AttrValue::string("MongoDB"))
                .block(
                    "consistency_policy",
                    Body::new().attr("consistency_level", AttrValue::string("Strong")),
                )
                .block(
                    "geo_location",
                    Body::new()
                        .attr("location", AttrValue::reference(&group, "location"))
                        .attr("failover_priority", AttrValue::Int(0)),
                ),
        ),
        ResourceBlock::new(
            ResourceAddress::new(MONGO_DATABASE_TYPE, TEST_RESOURCE_NAME),
            Body::new()
                .attr("name", AttrValue::String(acctest_name(ri)))
                .attr("resource_group_name", AttrValue::reference(&account, "resource_group_name"))
                .attr("account_name", AttrValue::reference(&account, "name")),
        ),
    ]
}

fn with_parent_database(ri: i64, location: &str, collection: CollectionSpec) -> ConfigDocument {
    let mut resources = mongo_database_prerequisites(ri, location);
    resources.push(collection.into_block());
    ConfigDocument::new(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::parse_config;

    #[test]
    fn test_render_is_deterministic() {
        for scenario in Scenario::ALL {
            assert_eq!(
                scenario.render(190_519_123_456_781_234, "westeurope"),
                scenario.render(190_519_123_456_781_234, "westeurope"),
                "{scenario} should render identically"
            );
        }
    }

    #[test]
    fn test_every_scenario_parses() {
        for scenario in Scenario::ALL {
            let doc = scenario.document(42, "westus");
            let parsed = parse_config(&doc.render())
                .unwrap_or_else(|e| panic!("{scenario} rendered invalid configuration: {e}"));
            assert_eq!(parsed, doc, "{scenario} should parse back to its document");
        }
    }

    #[test]
    fn test_basic_declares_prerequisites_and_names() {
        let text = Scenario::Basic.render(7, "westus");
        assert!(text.contains(r#"resource "azurerm_resource_group" "test""#));
        assert!(text.contains(r#"name     = "acctestRG-7""#));
        assert!(text.contains(r#"kind                = "MongoDB""#));
        assert!(text.contains(r#"database_name       = "${azurerm_cosmos_mongo_database.test.name}""#));
        assert!(!text.contains("indexes"));
    }

    #[test]
    fn test_complete_and_updated_differ() {
        let complete = Scenario::Complete.render(1, "westus");
        let updated = Scenario::Updated.render(1, "westus");
        assert!(complete.contains("default_ttl_seconds = 707\n"));
        assert!(complete.contains(r#"shard_key           = "seven""#));
        assert!(updated.contains("default_ttl_seconds = 70707\n"));
        assert!(updated.contains(r#"shard_key           = "days""#));
        assert!(updated.contains("unique = true"));
    }

    #[test]
    fn test_debug_has_no_prerequisites() {
        let doc = Scenario::Debug.document(1, "westus");
        assert_eq!(doc.resources.len(), 1);
        let body = &doc.resources[0].body;
        assert_eq!(body.get("name"), Some(&AttrValue::string("seven-day-tables-cola")));
        assert_eq!(body.get("database_name"), Some(&AttrValue::string("SevenDayDBs22")));
        assert_eq!(body.get("default_ttl_seconds"), Some(&AttrValue::Int(10000)));
        assert_eq!(body.blocks("indexes").count(), 2);
    }

    #[test]
    fn test_scenario_from_str() {
        assert_eq!("updated".parse::<Scenario>(), Ok(Scenario::Updated));
        let err = "nope".parse::<Scenario>().unwrap_err();
        assert!(err.contains("basic, complete, updated, debug, debug2"));
    }
}
