//! # Config Renderer
//!
//! Produces declarative configuration for named scenarios from typed resource
//! specs, and reads the same configuration subset back.

pub mod document;
pub mod parse;
pub mod scenarios;

pub use document::{AttrValue, Body, BodyItem, ConfigDocument, Reference, ResourceBlock};
pub use parse::{parse_config, ConfigParseError};
pub use scenarios::{
    acctest_name, collection_address, mongo_database_prerequisites, CollectionSpec, Scenario,
};
