//! # Brick Control - Request-time orchestration of bricks
//!
//! This crate sits between the host application's request handlers and the
//! brick registry and store:
//!
//! - [`DependencyResolver`]: which bricks of a page must reload together
//! - [`ReloadHandler`]: the stateless reload protocol, returning
//!   `(brick id, fragment)` pairs
//! - [`PageAssembler`]: detail, home and my-page views with their
//!   dependency maps
//! - [`Configurator`]: validated administration of placements and config
//!   items
//!
//! Every entry point takes a [`RequestContext`] carrying the requesting user
//! and a request id; nothing is cached between requests.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod configure;
pub mod context;
pub mod dependency;
pub mod error;
pub mod form;
pub mod page;
pub mod reload;
pub mod rendering;

// Re-exports
pub use configure::{
    Configurator, DetailLayoutView, NewCustomItem, NewInstanceItem, NewRelationItem, PanelListView,
};
pub use context::RequestContext;
pub use dependency::{DependencyMap, DependencyResolver};
pub use error::{ControlError, FieldError, FieldErrorCode, FieldErrors, Result};
pub use form::{parse_panel_list, parse_zone_layout, PlacementChoices, LAYOUT_FIELD};
pub use page::{DetailPage, PageAssembler, PanelPage};
pub use reload::{
    parse_extra_data, ReloadConfig, ReloadHandler, ReloadRequest, ReloadResponse, ReloadTarget,
};
pub use rendering::{PanelRenderer, RenderPass, RenderedPanel};
