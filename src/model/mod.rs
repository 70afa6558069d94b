//! # Data Model
//!
//! Resource keys, collection attributes and lifecycle state shared by the
//! renderer, backends, orchestrators and the harness.

pub mod collection;
pub mod key;
pub mod state;

pub use collection::{CollectionAttributes, IndexDescriptor};
pub use key::{ResourceIdError, ResourceKey};
pub use state::{flatten_values, LifecycleState, ResourceAddress, ResourceState};
