#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod artifact;
pub mod comments;
pub mod config;
pub mod container;
pub mod error;
pub mod fetch;
pub mod menu;
pub mod page;
pub mod pagination;
pub mod pool;
pub mod providers;
pub mod render;
pub mod storage;
pub mod style;
pub mod tweaks;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{resolve_once, App};
pub use artifact::MediaArtifact;
pub use error::MediaError;
