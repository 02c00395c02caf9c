//! Brick Types - Core types for the dashboard panel framework
//!
//! A *brick* is a renderable, independently-reloadable unit of dashboard
//! content. Bricks are shown on the detail view of a business record, on the
//! workspace home page, or on a user's personal "my page".
//!
//! ## Key Concepts
//!
//! - **PanelDescriptor**: Static metadata of a brick (id, kind, dependencies)
//! - **PlacementRule**: Where a brick appears for a (record type, zone, audience)
//! - **Audience**: The role / superuser / default layering dimension
//! - **Config items**: Stored rows parameterizing synthesized bricks
//! - **PanelState**: Per-user persisted UI state of one brick
//! - **Record / User**: Minimal views of the host application's models

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod descriptor;
pub mod ids;
pub mod items;
pub mod placement;
pub mod record;
pub mod state;

// Re-export main types
pub use descriptor::{Dependency, DependencyKey, DependencyKeys, PanelDescriptor, PanelKind};
pub use ids::{
    InstanceClassId, PanelId, PanelOrigin, RecordId, RecordType, RelationTypeId, RoleId, UserId,
};
pub use items::{CustomFieldConfigItem, InstanceConfigItem, RelationConfigItem};
pub use placement::{
    Audience, HomePlacementRule, MyPagePlacementRule, PlacementRule, Zone, ZoneLayout,
    ZoneParseError,
};
pub use record::{Record, Relation, User};
pub use state::{PanelState, StateFields};
