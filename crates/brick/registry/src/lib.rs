//! # Brick Registry - Panel variants, registry and materialization
//!
//! A brick is one renderable, independently reloadable unit of dashboard
//! content. This crate defines:
//!
//! - [`Panel`]: the closed set of brick variants behind one interface
//! - [`PanelRegistry`]: the catalog of statically registered bricks
//! - [`PanelFactory`]: turns brick ids into bricks for one request, batching
//!   the lookups of synthesized bricks and degrading unknown or forbidden ids
//!   to placeholders
//! - the collaborator interfaces consumed from the host application:
//!   [`TemplateRenderer`], [`RecordSource`] and [`PermissionChecker`]
//!
//! ## Initialization
//!
//! The registry is populated once at startup through a builder, then shared
//! read-only behind an `Arc`. Tests that need a different catalog clone it
//! and reopen the clone instead of mutating the shared instance:
//!
//! ```rust
//! use brick_registry::{Panel, PanelRegistry, Templates};
//! use brick_types::{PanelDescriptor, PanelKind};
//!
//! let mut builder = PanelRegistry::builder();
//! builder
//!     .register(Panel::simple(
//!         PanelDescriptor::new("persons-card", PanelKind::Simple).depends_on("persons.contact"),
//!         Templates::detail("persons/bricks/card.html"),
//!     ))
//!     .unwrap();
//!
//! let registry = std::sync::Arc::new(builder.build());
//! assert!(registry.get(&"persons-card".into()).is_ok());
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod factory;
pub mod panel;
pub mod permission;
pub mod registry;
pub mod reloading;
pub mod render;
pub mod source;

// Re-exports
pub use error::{RegistryError, Result};
pub use factory::PanelFactory;
pub use panel::{
    CustomPanel, InstanceClass, InstancePanel, ListSource, PaginatedPanel, Panel, PanelBody,
    QuerysetPanel, RelationPanel, SimplePanel, Templates, VoidReason,
};
pub use permission::{AllowAllPermissions, PermissionChecker, RolePermissions};
pub use registry::{PanelRegistry, PanelRegistryBuilder};
pub use reloading::{ReloadingInfo, ReloadingInfoError};
pub use render::{
    JsonRenderer, PageWindow, RenderContext, RenderServices, Surface, TemplateRenderer,
};
pub use source::{InMemoryRecordSource, OrderBy, RecordQuery, RecordSource, Window};
