//! # Harness Errors
//!
//! Every way a lifecycle run can fail, and the category operators use to tell
//! a broken harness from a broken resource.

use crate::model::{ResourceAddress, ResourceKey};
use crate::orchestrator::OrchestratorError;
use crate::provider::BackendError;
use crate::render::ConfigParseError;
use std::fmt;
use thiserror::Error;

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureCategory {
    /// The resource did not behave as expected
    Assertion,
    /// The backend could not be asked (network, auth, timeout)
    Transport,
    /// The orchestrator failed to apply, import or destroy
    Orchestration,
    /// The test itself is broken (missing state, bad attributes, precheck)
    Harness,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Assertion => "assertion",
            FailureCategory::Transport => "transport",
            FailureCategory::Orchestration => "orchestration",
            FailureCategory::Harness => "harness",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attribute that differs between applied and imported state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDiff {
    pub attribute: String,
    pub applied: Option<String>,
    pub imported: Option<String>,
}

impl fmt::Display for AttributeDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: applied {}, imported {}",
            self.attribute,
            show(self.applied.as_deref()),
            show(self.imported.as_deref())
        )
    }
}

fn show(value: Option<&str>) -> String {
    value.map_or_else(|| "<unset>".to_string(), |v| format!("{v:?}"))
}

fn join<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{address} is missing required attributes: {}", .missing.join(", "))]
    MissingAttribute {
        address: ResourceAddress,
        missing: Vec<&'static str>,
    },

    #[error("Not found: {0} in state")]
    ResourceNotInState(ResourceAddress),

    #[error("Bad: Cosmos Mongo Collection {key} does not exist")]
    NotFound { key: ResourceKey },

    #[error("Cosmos Mongo Collection {key} still exists")]
    StillExists { key: ResourceKey },

    #[error("Bad: Get on cosmosMongoCollection for {key}: {source}")]
    Transport {
        key: ResourceKey,
        #[source]
        source: BackendError,
    },

    #[error("{address}: attribute '{attribute}' expected {}, got {}", show(.expected.as_deref()), show(.actual.as_deref()))]
    AttributeMismatch {
        address: ResourceAddress,
        attribute: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("{address}: imported state differs from applied state: {}", join(.diffs, "; "))]
    ImportMismatch {
        address: ResourceAddress,
        diffs: Vec<AttributeDiff>,
    },

    #[error(transparent)]
    Orchestration(OrchestratorError),

    #[error("configuration does not parse: {0}")]
    ConfigParse(#[from] ConfigParseError),

    #[error("acceptance precheck failed, missing: {}", .missing.join(", "))]
    Precheck { missing: Vec<&'static str> },

    #[error("{} checks failed: {}", .0.len(), join(.0, "; "))]
    Checks(Vec<HarnessError>),
}

impl HarnessError {
    /// Category of this failure; aggregates report their most severe member
    pub fn category(&self) -> FailureCategory {
        match self {
            HarnessError::MissingAttribute { .. }
            | HarnessError::ResourceNotInState(_)
            | HarnessError::Precheck { .. }
            | HarnessError::ConfigParse(_) => FailureCategory::Harness,
            HarnessError::NotFound { .. }
            | HarnessError::StillExists { .. }
            | HarnessError::AttributeMismatch { .. }
            | HarnessError::ImportMismatch { .. } => FailureCategory::Assertion,
            HarnessError::Transport { .. } => FailureCategory::Transport,
            HarnessError::Orchestration(_) => FailureCategory::Orchestration,
            HarnessError::Checks(errors) => errors
                .iter()
                .map(HarnessError::category)
                .max()
                .unwrap_or(FailureCategory::Assertion),
        }
    }

    /// Collapse a list of check failures: none, one as-is, or an aggregate
    pub fn from_checks(mut errors: Vec<HarnessError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(HarnessError::Checks(errors)),
        }
    }
}

impl From<OrchestratorError> for HarnessError {
    fn from(error: OrchestratorError) -> Self {
        match error {
            OrchestratorError::Config(e) => HarnessError::ConfigParse(e),
            other => HarnessError::Orchestration(other),
        }
    }
}

/// Failure of a single lifecycle step
#[derive(Debug)]
pub struct StepFailure {
    /// 1-based step number; 0 for session setup
    pub step: usize,
    pub description: String,
    pub error: HarnessError,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({}): {}", self.step, self.description, self.error)
    }
}

/// Everything that went wrong in one lifecycle run
#[derive(Debug)]
pub struct LifecycleFailure {
    pub case: String,
    pub ri: i64,
    pub step: Option<StepFailure>,
    pub destroy: Vec<HarnessError>,
}

impl LifecycleFailure {
    /// Most severe category across the step failure and destroy failures
    pub fn category(&self) -> FailureCategory {
        self.step
            .iter()
            .map(|s| s.error.category())
            .chain(self.destroy.iter().map(HarnessError::category))
            .max()
            .unwrap_or(FailureCategory::Harness)
    }
}

impl fmt::Display for LifecycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case '{}' (ri {}) failed [{}]", self.case, self.ri, self.category())?;
        if let Some(step) = &self.step {
            write!(f, "\n  {step}")?;
        }
        for error in &self.destroy {
            write!(f, "\n  destroy: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LifecycleFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key() -> ResourceKey {
        ResourceKey::new("rg", "acc", "db", "coll")
    }

    #[test]
    fn test_categories() {
        let address = ResourceAddress::new("azurerm_cosmos_mongo_collection", "test");
        assert_eq!(
            HarnessError::ResourceNotInState(address.clone()).category(),
            FailureCategory::Harness
        );
        assert_eq!(
            HarnessError::NotFound { key: key() }.category(),
            FailureCategory::Assertion
        );
        assert_eq!(
            HarnessError::Transport {
                key: key(),
                source: BackendError::Timeout(Duration::from_secs(30)),
            }
            .category(),
            FailureCategory::Transport
        );
        assert_eq!(
            HarnessError::MissingAttribute {
                address,
                missing: vec!["database_name"],
            }
            .category(),
            FailureCategory::Harness
        );
    }

    #[test]
    fn test_rejected_config_is_a_harness_failure() {
        let err = HarnessError::from(OrchestratorError::Config(
            crate::render::parse_config("resource {").unwrap_err(),
        ));
        assert!(matches!(err, HarnessError::ConfigParse(_)));
        assert_eq!(err.category(), FailureCategory::Harness);

        let err = HarnessError::from(OrchestratorError::Cancelled(crate::orchestrator::Operation::Apply));
        assert_eq!(err.category(), FailureCategory::Orchestration);
    }

    #[test]
    fn test_aggregate_category_is_most_severe() {
        let aggregate = HarnessError::Checks(vec![
            HarnessError::StillExists { key: key() },
            HarnessError::Transport {
                key: key(),
                source: BackendError::Cancelled,
            },
        ]);
        assert_eq!(aggregate.category(), FailureCategory::Transport);
    }

    #[test]
    fn test_from_checks() {
        assert!(HarnessError::from_checks(Vec::new()).is_none());
        let single = HarnessError::from_checks(vec![HarnessError::NotFound { key: key() }]);
        assert!(matches!(single, Some(HarnessError::NotFound { .. })));
        let many = HarnessError::from_checks(vec![
            HarnessError::NotFound { key: key() },
            HarnessError::StillExists { key: key() },
        ]);
        assert!(matches!(many, Some(HarnessError::Checks(ref v)) if v.len() == 2));
    }

    #[test]
    fn test_messages_name_the_key() {
        let message = HarnessError::StillExists { key: key() }.to_string();
        assert!(message.contains("'coll'"), "{message}");
        assert!(message.contains("account: 'acc'"), "{message}");

        let mismatch = HarnessError::AttributeMismatch {
            address: ResourceAddress::new("azurerm_cosmos_mongo_collection", "test"),
            attribute: "shard_key".to_string(),
            expected: Some("days".to_string()),
            actual: None,
        };
        assert!(mismatch.to_string().contains("expected \"days\", got <unset>"));
    }

    #[test]
    fn test_lifecycle_failure_display() {
        let failure = LifecycleFailure {
            case: "basic".to_string(),
            ri: 7,
            step: Some(StepFailure {
                step: 1,
                description: "apply basic".to_string(),
                error: HarnessError::NotFound { key: key() },
            }),
            destroy: vec![HarnessError::StillExists { key: key() }],
        };
        let text = failure.to_string();
        assert!(text.starts_with("case 'basic' (ri 7) failed [assertion]"));
        assert!(text.contains("step 1 (apply basic)"));
        assert!(text.contains("destroy: Cosmos Mongo Collection"));
    }
}
