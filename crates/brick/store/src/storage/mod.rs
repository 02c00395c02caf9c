//! Storage backends.
//!
//! Provides storage abstractions for placement rows, config items and panel
//! states.

pub mod memory;
pub mod traits;

pub use memory::InMemoryStorage;
pub use traits::{BrickStorage, ConfigItemStorage, PlacementStorage, StateStorage};
