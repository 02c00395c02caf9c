//! # Brick Store - Placement configuration and panel state
//!
//! This crate owns everything the brick framework persists:
//!
//! - **Placement rows** for detail views, the home page and "my page"
//! - **Config items** backing synthesized bricks (instance, relation, custom)
//! - **Panel states**, the per-user UI state of each brick
//!
//! ## Key Components
//!
//! - [`PlacementService`]: Layered placement resolution and validated writes
//! - [`ConfigItemService`]: Config item lifecycle with in-use protection
//! - [`PanelStateManager`]: Best-effort state upserts with optimistic retry
//! - [`InMemoryStorage`]: Storage backend for development and tests
//!
//! Configuration writes are expected to run inside the host application's
//! transaction boundary; this crate does not manage transactions itself.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod items;
pub mod placement;
pub mod state;
pub mod storage;

// Re-exports
pub use error::{ConflictReason, Result, StoreError};
pub use items::ConfigItemService;
pub use placement::{HomeResolution, LayerKey, PlacementService, Resolution};
pub use state::{PanelStateManager, StateManagerConfig};
pub use storage::{
    BrickStorage, ConfigItemStorage, InMemoryStorage, PlacementStorage, StateStorage,
};
