//! Brick daemon library
//!
//! The HTTP face of the brick framework:
//! - reload endpoints returning `[[brick id, fragment], ...]`
//! - brick state updates
//! - page views with their dependency maps
//! - placement and config item administration
//!
//! The daemon runs over the in-memory store; the demonstration catalog
//! gives a fresh instance bricks and records to work with.

#![deny(unsafe_code)]

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod server;
pub mod templates;

pub use config::DaemonConfig;
pub use error::{ApiError, ApiResult, DaemonError, DaemonResult};
pub use server::{Collaborators, Server};
pub use templates::HtmlTemplates;
