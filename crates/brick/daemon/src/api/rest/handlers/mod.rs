//! API request handlers

mod config;
mod health;
mod items;
mod pages;
mod reload;
mod state;

pub use config::*;
pub use health::*;
pub use items::*;
pub use pages::*;
pub use reload::*;
pub use state::*;
