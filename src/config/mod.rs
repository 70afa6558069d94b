//! # Harness Configuration
//!
//! Harness-level configuration loaded from environment variables.
//!
//! All configuration has sensible defaults and can be overridden via environment variables.
//! The CLI preloads a local `.env` file before reading them.

mod harness;

pub use harness::{AzureAuthConfig, HarnessConfig};

/// Load configuration from environment variables with defaults
pub fn load_config() -> HarnessConfig {
    HarnessConfig::from_env()
}
