//! # Lifecycle Harness
//!
//! Drives test cases through apply, check, import, destroy and destruction
//! verification.
//!
//! ## Sub-modules
//!
//! - `context` - Shared configuration, backend client, orchestrator and cancellation
//! - `steps` - Test cases, steps and state checks
//! - `driver` - Step execution with guaranteed teardown
//! - `checker` - Bounded existence lookups
//! - `destroy` - Post-teardown leak detection
//! - `error` - Failure types and categories
//! - `names` - Per-run random suffix

pub mod checker;
pub mod context;
pub mod destroy;
pub mod driver;
pub mod error;
pub mod names;
pub mod steps;

pub use checker::ExistenceChecker;
pub use context::HarnessContext;
pub use destroy::DestructionVerifier;
pub use driver::{LifecycleDriver, RunReport};
pub use error::{AttributeDiff, FailureCategory, HarnessError, LifecycleFailure, StepFailure};
pub use names::rand_time_int;
pub use steps::{StateCheck, StepConfig, TestCase, TestStep};
