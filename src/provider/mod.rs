//! # Backend Clients
//!
//! The narrow interface the harness uses to observe Mongo collections, plus
//! its implementations:
//! - Azure Resource Manager REST client for live runs
//! - In-memory store for local runs and tests

pub mod azure;
pub mod memory;

pub use azure::AzureCollectionClient;
pub use memory::InMemoryCosmos;

use crate::model::{CollectionAttributes, ResourceKey};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result of a point lookup that reached the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(CollectionAttributes),
    NotFound,
}

impl LookupOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, LookupOutcome::Found(_))
    }
}

/// Failure of the lookup call itself, as opposed to a definite answer
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("lookup timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("lookup cancelled")]
    Cancelled,
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to acquire access token: {0}")]
    Auth(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Short reason string for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendError::Timeout(_) => "timeout",
            BackendError::Cancelled => "cancelled",
            BackendError::Http { .. } => "http",
            BackendError::Request(_) => "request",
            BackendError::Decode(_) => "decode",
            BackendError::Auth(_) => "auth",
            BackendError::Unavailable(_) => "unavailable",
        }
    }

    /// Throttling, server errors and network failures are worth a rerun
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Timeout(_) | BackendError::Request(_) | BackendError::Unavailable(_) => {
                true
            }
            BackendError::Http { status, .. } => *status == 429 || *status >= 500,
            BackendError::Cancelled | BackendError::Decode(_) | BackendError::Auth(_) => false,
        }
    }
}

/// Point lookup of Mongo collections by key
///
/// This is the entire backend surface the harness depends on.
#[async_trait]
pub trait CollectionClient: Send + Sync + std::fmt::Debug {
    async fn get_mongo_collection(&self, key: &ResourceKey)
        -> Result<LookupOutcome, BackendError>;
}
