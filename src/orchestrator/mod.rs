//! # Orchestrators
//!
//! The collaborator that turns configuration text into applied resources and
//! lifecycle state. Each lifecycle run gets its own [`Session`] so parallel
//! runs never share working state.
//!
//! - [`TerraformOrchestrator`] drives the `terraform` binary in a temporary workspace
//! - [`LocalOrchestrator`] applies configurations directly to an [`InMemoryCosmos`](crate::provider::InMemoryCosmos)

pub mod local;
pub mod terraform;

pub use local::LocalOrchestrator;
pub use terraform::TerraformOrchestrator;

use crate::model::{LifecycleState, ResourceAddress, ResourceState};
use crate::render::ConfigParseError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Orchestrator operation, for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Begin,
    Apply,
    Import,
    Destroy,
    State,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Begin => "begin",
            Operation::Apply => "apply",
            Operation::Import => "import",
            Operation::Destroy => "destroy",
            Operation::State => "state",
        })
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("{operation} failed: {message}")]
    Failed {
        operation: Operation,
        message: String,
    },
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigParseError),
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        operation: Operation,
        timeout: Duration,
    },
    #[error("{0} cancelled")]
    Cancelled(Operation),
}

impl OrchestratorError {
    pub fn failed(operation: Operation, message: impl Into<String>) -> Self {
        Self::Failed {
            operation,
            message: message.into(),
        }
    }

    /// Wrap an `anyhow` chain, keeping every cause in the message
    pub fn from_anyhow(operation: Operation, error: &anyhow::Error) -> Self {
        Self::failed(operation, format!("{error:#}"))
    }
}

/// Creates one isolated session per lifecycle run
#[async_trait]
pub trait Orchestrator: Send + Sync + fmt::Debug {
    async fn begin(&self, run_id: &str) -> Result<Box<dyn Session>, OrchestratorError>;
}

/// Working state of one lifecycle run
#[async_trait]
pub trait Session: Send + fmt::Debug {
    /// Apply configuration text and return the resulting state
    async fn apply(&mut self, config: &str) -> Result<LifecycleState, OrchestratorError>;

    /// Import the resource with `id` at `address` into fresh state and return it
    ///
    /// The session's own state is not modified.
    async fn import(
        &mut self,
        config: &str,
        address: &ResourceAddress,
        id: &str,
    ) -> Result<ResourceState, OrchestratorError>;

    /// Destroy everything the session has applied
    async fn destroy(&mut self, config: &str) -> Result<(), OrchestratorError>;

    /// Resources the session currently manages
    ///
    /// After a failed or interrupted apply this includes whatever that apply
    /// created before it stopped.
    async fn state(&mut self) -> Result<LifecycleState, OrchestratorError>;
}
