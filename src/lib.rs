//! # Cosmos Mongo Acceptance Harness
//!
//! Lifecycle acceptance testing for Azure Cosmos DB Mongo collections managed
//! through Terraform.
//!
//! ## Overview
//!
//! A lifecycle run:
//!
//! 1. **Renders configuration** - Typed documents for named scenarios, unique per run suffix
//! 2. **Applies it** - Through an orchestrator session (terraform, or a local in-memory one)
//! 3. **Checks the result** - State attribute checks plus point lookups against the backend
//! 4. **Imports and compares** - Re-reads the resource by ID and diffs it with applied state
//! 5. **Tears down** - Destroy always runs, then every recorded collection must be gone
//!
//! ## Features
//!
//! - **Concurrent runs**: Independent cases run in parallel with their own suffix and session
//! - **Categorized failures**: Harness, assertion, transport and orchestration failures are distinct
//! - **Bounded I/O**: Every lookup and step has a deadline and honours cancellation
//! - **Prometheus metrics**: Runs, steps, lookups and leaked resources

pub mod acceptance;
pub mod config;
pub mod constants;
pub mod harness;
pub mod model;
pub mod observability;
pub mod orchestrator;
pub mod provider;
pub mod render;
pub mod runtime;
