//! Lifecycle cases for `azurerm_cosmos_mongo_collection`.

use crate::constants::MONGO_COLLECTION_TYPE;
use crate::harness::{rand_time_int, StateCheck, TestCase, TestStep};
use crate::model::ResourceAddress;
use crate::render::{acctest_name, collection_address, Scenario};

/// Case names accepted by [`case_by_name`]
pub const CASE_NAMES: [&str; 4] = ["basic", "complete", "update", "debug"];

/// Existence plus the three key attributes rendered from the suffix
fn key_attribute_checks(address: &ResourceAddress, ri: i64) -> Vec<StateCheck> {
    let rn = acctest_name(ri);
    vec![
        StateCheck::Exists(address.clone()),
        StateCheck::attr(address, "name", rn.as_str()),
        StateCheck::attr(address, "account_name", rn.as_str()),
        StateCheck::attr(address, "database_name", rn.as_str()),
    ]
}

fn settings_checks(address: &ResourceAddress, ttl: &str, shard_key: &str, indexes: usize) -> Vec<StateCheck> {
    vec![
        StateCheck::attr(address, "default_ttl_seconds", ttl),
        StateCheck::attr(address, "shard_key", shard_key),
        StateCheck::attr(address, "indexes.#", indexes.to_string()),
    ]
}

/// Apply the basic scenario, check it, import and verify
pub fn basic(ri: i64) -> TestCase {
    let address = collection_address();
    let case = TestCase::new("basic", MONGO_COLLECTION_TYPE).with_suffix(ri);
    case.step(TestStep::apply(Scenario::Basic).checks(key_attribute_checks(&address, ri)))
        .step(TestStep::import_verify(address))
}

/// Apply the complete scenario, check it, import and verify
pub fn complete(ri: i64) -> TestCase {
    let address = collection_address();
    let case = TestCase::new("complete", MONGO_COLLECTION_TYPE).with_suffix(ri);
    case.step(
        TestStep::apply(Scenario::Complete)
            .checks(key_attribute_checks(&address, ri))
            .checks(settings_checks(&address, "707", "seven", 3)),
    )
    .step(TestStep::import_verify(address))
}

/// Basic, then complete, then updated, importing after each apply
pub fn update(ri: i64) -> TestCase {
    let address = collection_address();
    let case = TestCase::new("update", MONGO_COLLECTION_TYPE).with_suffix(ri);
    case.step(
        TestStep::apply(Scenario::Basic)
            .checks(key_attribute_checks(&address, ri))
            .check(StateCheck::no_attr(&address, "default_ttl_seconds")),
    )
    .step(TestStep::import_verify(address.clone()))
    .step(
        TestStep::apply(Scenario::Complete)
            .checks(key_attribute_checks(&address, ri))
            .checks(settings_checks(&address, "707", "seven", 3)),
    )
    .step(TestStep::import_verify(address.clone()))
    .step(
        TestStep::apply(Scenario::Updated)
            .checks(key_attribute_checks(&address, ri))
            .checks(settings_checks(&address, "70707", "days", 3)),
    )
    .step(TestStep::import_verify(address))
}

/// Apply the debug scenario against the long-lived debug account
pub fn debug(ri: i64) -> TestCase {
    let address = collection_address();
    TestCase::new("debug", MONGO_COLLECTION_TYPE)
        .with_suffix(ri)
        .step(TestStep::apply(Scenario::Debug).checks([
            StateCheck::Exists(address.clone()),
            StateCheck::attr(&address, "name", "seven-day-tables-cola"),
            StateCheck::attr(&address, "database_name", "SevenDayDBs22"),
        ]))
        .step(TestStep::import_verify(address))
}

/// Every case except `debug`, which needs a pre-existing account, each with
/// its own fresh suffix
pub fn all() -> Vec<TestCase> {
    vec![
        basic(rand_time_int()),
        complete(rand_time_int()),
        update(rand_time_int()),
    ]
}

/// Case `name` with a fresh suffix
pub fn case_by_name(name: &str) -> Option<TestCase> {
    let ri = rand_time_int();
    match name {
        "basic" => Some(basic(ri)),
        "complete" => Some(complete(ri)),
        "update" => Some(update(ri)),
        "debug" => Some(debug(ri)),
        _ => None,
    }
}
