//! # Acceptance Cases
//!
//! Lifecycle test cases for the resource types the harness covers.

pub mod mongo_collection;
