//! # Test Cases
//!
//! A test case is an ordered list of steps run against one fresh set of
//! resources. Apply steps render a configuration and check the resulting
//! state; import steps re-read a resource by ID and compare.

use super::error::HarnessError;
use super::names::rand_time_int;
use crate::model::{LifecycleState, ResourceAddress};
use crate::render::{ConfigDocument, Scenario};
use std::fmt;

/// Configuration applied by a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepConfig {
    /// Rendered with the run's suffix and location
    Scenario(Scenario),
    /// Used as-is
    Document(ConfigDocument),
}

impl StepConfig {
    pub fn render(&self, ri: i64, location: &str) -> String {
        match self {
            StepConfig::Scenario(scenario) => scenario.render(ri, location),
            StepConfig::Document(document) => document.render(),
        }
    }
}

impl fmt::Display for StepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepConfig::Scenario(scenario) => write!(f, "{scenario}"),
            StepConfig::Document(_) => f.write_str("inline config"),
        }
    }
}

/// Assertion against lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateCheck {
    /// Resource exists in state and in the backend
    Exists(ResourceAddress),
    AttrEquals {
        address: ResourceAddress,
        key: String,
        value: String,
    },
    AttrSet {
        address: ResourceAddress,
        key: String,
    },
    NoAttr {
        address: ResourceAddress,
        key: String,
    },
}

impl StateCheck {
    pub fn attr(address: &ResourceAddress, key: impl Into<String>, value: impl Into<String>) -> Self {
        StateCheck::AttrEquals {
            address: address.clone(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn attr_set(address: &ResourceAddress, key: impl Into<String>) -> Self {
        StateCheck::AttrSet {
            address: address.clone(),
            key: key.into(),
        }
    }

    pub fn no_attr(address: &ResourceAddress, key: impl Into<String>) -> Self {
        StateCheck::NoAttr {
            address: address.clone(),
            key: key.into(),
        }
    }

    /// Evaluate attribute checks against state
    ///
    /// `Exists` needs a backend lookup and is evaluated by the driver; here it
    /// only requires the resource to be in state.
    pub fn evaluate_attributes(&self, state: &LifecycleState) -> Result<(), HarnessError> {
        let (address, key) = match self {
            StateCheck::Exists(address) => {
                return state
                    .get(address)
                    .map(|_| ())
                    .ok_or_else(|| HarnessError::ResourceNotInState(address.clone()));
            }
            StateCheck::AttrEquals { address, key, .. }
            | StateCheck::AttrSet { address, key }
            | StateCheck::NoAttr { address, key } => (address, key),
        };

        let resource = state
            .get(address)
            .ok_or_else(|| HarnessError::ResourceNotInState(address.clone()))?;
        let actual = resource.attribute(key);

        let mismatch = |expected: Option<&str>| HarnessError::AttributeMismatch {
            address: address.clone(),
            attribute: key.clone(),
            expected: expected.map(str::to_string),
            actual: actual.map(str::to_string),
        };

        match self {
            StateCheck::AttrEquals { value, .. } if actual != Some(value.as_str()) => {
                Err(mismatch(Some(value)))
            }
            StateCheck::AttrSet { .. } if actual.is_none_or(str::is_empty) => {
                Err(mismatch(Some("<any value>")))
            }
            StateCheck::NoAttr { .. } if actual.is_some() => Err(mismatch(None)),
            _ => Ok(()),
        }
    }
}

/// One step of a test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStep {
    Apply {
        config: StepConfig,
        checks: Vec<StateCheck>,
    },
    Import {
        address: ResourceAddress,
        /// Compare imported attributes with the applied ones
        verify: bool,
        /// Attribute keys (or key prefixes) excluded from the comparison
        ignore: Vec<String>,
    },
}

impl TestStep {
    pub fn apply(scenario: Scenario) -> Self {
        TestStep::Apply {
            config: StepConfig::Scenario(scenario),
            checks: Vec::new(),
        }
    }

    /// Import `address` and verify it against applied state
    pub fn import_verify(address: ResourceAddress) -> Self {
        TestStep::Import {
            address,
            verify: true,
            ignore: Vec::new(),
        }
    }

    /// Add a check to an apply step; import steps ignore checks
    #[must_use]
    pub fn check(mut self, check: StateCheck) -> Self {
        if let TestStep::Apply { checks, .. } = &mut self {
            checks.push(check);
        }
        self
    }

    #[must_use]
    pub fn checks(self, checks: impl IntoIterator<Item = StateCheck>) -> Self {
        checks.into_iter().fold(self, TestStep::check)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TestStep::Apply { .. } => "apply",
            TestStep::Import { .. } => "import",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TestStep::Apply { config, .. } => format!("apply {config}"),
            TestStep::Import { address, .. } => format!("import {address}"),
        }
    }
}

/// Ordered steps against one set of resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    /// Per-run suffix shared by every rendered name
    pub ri: i64,
    /// Type whose instances must be gone after destroy
    pub resource_type: String,
    pub steps: Vec<TestStep>,
    pub check_destroy: bool,
}

impl TestCase {
    /// New case with a fresh suffix and destroy verification enabled
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ri: rand_time_int(),
            resource_type: resource_type.into(),
            steps: Vec::new(),
            check_destroy: true,
        }
    }

    #[must_use]
    pub fn with_suffix(mut self, ri: i64) -> Self {
        self.ri = ri;
        self
    }

    #[must_use]
    pub fn step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn without_destroy_check(mut self) -> Self {
        self.check_destroy = false;
        self
    }
}
