//! # Runtime Module
//!
//! Process setup for the acceptance harness: crypto provider, tracing,
//! metrics and the harness context.

pub mod initialization;

pub use initialization::*;
