//! # Constants
//!
//! Resource type names, API versions and configuration defaults shared across the harness.

/// Resource type under test
pub const MONGO_COLLECTION_TYPE: &str = "azurerm_cosmos_mongo_collection";

/// Prerequisite resource types rendered ahead of the collection
pub const MONGO_DATABASE_TYPE: &str = "azurerm_cosmos_mongo_database";
pub const COSMOS_ACCOUNT_TYPE: &str = "azurerm_cosmosdb_account";
pub const RESOURCE_GROUP_TYPE: &str = "azurerm_resource_group";

/// Local name used for every resource block in rendered configurations
pub const TEST_RESOURCE_NAME: &str = "test";

/// Attributes that together form a collection's resource key
pub const KEY_ATTRIBUTES: [&str; 4] = [
    "name",
    "resource_group_name",
    "account_name",
    "database_name",
];

/// Default Azure Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// OAuth scope for Azure Resource Manager tokens
pub const ARM_SCOPE: &str = "https://management.azure.com/.default";

/// ARM API version used for Mongo collection lookups
pub const MONGO_COLLECTION_API_VERSION: &str = "2021-04-15";

/// Location used when ARM_TEST_LOCATION is not set
pub const DEFAULT_TEST_LOCATION: &str = "westus";

/// Default deadline for a single backend lookup (seconds)
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 30;

/// Default deadline for a single apply/import/destroy step (seconds)
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 1800;

/// azurerm provider constraint for terraform workspaces; the 1.x line carries
/// the collection's `indexes { key, unique }` block
pub const DEFAULT_AZURERM_VERSION: &str = "~> 1.44";

/// Default number of lifecycle cases run concurrently by the CLI
pub const DEFAULT_PARALLELISM: usize = 4;

/// Default tracing filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "cosmos_mongo_acctest=info";

/// Subscription used in resource IDs when running against the in-memory backend
pub const LOCAL_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";
