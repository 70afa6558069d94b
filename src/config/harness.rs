//! # Harness Configuration
//!
//! Acceptance harness settings loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Azure authentication configuration for the lookup client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AzureAuthConfig {
    /// Use Workload Identity with the given client ID
    WorkloadIdentity {
        /// Azure service principal client ID
        client_id: String,
    },
}

/// Acceptance harness configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Acceptance gate (`TF_ACC`); live cases refuse to run without it
    pub acceptance_enabled: bool,
    /// Subscription used for ARM lookups and import IDs
    pub subscription_id: Option<String>,
    /// Location passed to the config renderer
    pub location: String,
    /// ARM endpoint (overridable for mock servers)
    pub arm_endpoint: String,
    /// Authentication for the lookup client. `None` means Managed Identity.
    pub auth: Option<AzureAuthConfig>,
    /// Use a static token instead of a real credential
    pub mock_auth: bool,
    /// Deadline for a single backend lookup
    pub lookup_timeout_secs: u64,
    /// Deadline for a single apply/import/destroy step
    pub step_timeout_secs: u64,
    /// Concurrent lifecycle cases in the CLI
    pub parallelism: usize,
    /// Explicit terraform binary; falls back to `PATH`
    pub terraform_binary: Option<PathBuf>,
    /// Version constraint for the azurerm provider in terraform workspaces
    pub azurerm_version: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            acceptance_enabled: false,
            subscription_id: None,
            location: DEFAULT_TEST_LOCATION.to_string(),
            arm_endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            auth: None,
            mock_auth: false,
            lookup_timeout_secs: DEFAULT_LOOKUP_TIMEOUT_SECS,
            step_timeout_secs: DEFAULT_STEP_TIMEOUT_SECS,
            parallelism: DEFAULT_PARALLELISM,
            terraform_binary: None,
            azurerm_version: DEFAULT_AZURERM_VERSION.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            acceptance_enabled: env_flag("TF_ACC"),
            subscription_id: env_non_empty("ARM_SUBSCRIPTION_ID"),
            location: env_non_empty("ARM_TEST_LOCATION")
                .unwrap_or_else(|| DEFAULT_TEST_LOCATION.to_string()),
            arm_endpoint: env_non_empty("ARM_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ARM_ENDPOINT.to_string()),
            auth: env_non_empty("ARM_CLIENT_ID")
                .map(|client_id| AzureAuthConfig::WorkloadIdentity { client_id }),
            mock_auth: env_flag("ACCTEST_MOCK_AUTH"),
            lookup_timeout_secs: env_var_or_default(
                "ACCTEST_LOOKUP_TIMEOUT_SECS",
                DEFAULT_LOOKUP_TIMEOUT_SECS,
            ),
            step_timeout_secs: env_var_or_default(
                "ACCTEST_STEP_TIMEOUT_SECS",
                DEFAULT_STEP_TIMEOUT_SECS,
            ),
            parallelism: env_var_or_default("ACCTEST_PARALLELISM", DEFAULT_PARALLELISM).max(1),
            terraform_binary: env_non_empty("TERRAFORM_BINARY").map(PathBuf::from),
            azurerm_version: env_var_or_default(
                "ACCTEST_AZURERM_VERSION",
                DEFAULT_AZURERM_VERSION.to_string(),
            ),
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    /// Names of the variables a live run needs but does not have
    ///
    /// Empty when the configuration is complete.
    pub fn missing_live_requirements(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.acceptance_enabled {
            missing.push("TF_ACC");
        }
        if self.subscription_id.is_none() {
            missing.push("ARM_SUBSCRIPTION_ID");
        }
        if self.location.trim().is_empty() {
            missing.push("ARM_TEST_LOCATION");
        }
        missing
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Any non-empty value other than `0` or `false` enables a flag
fn env_flag(key: &str) -> bool {
    env_non_empty(key).is_some_and(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
}
