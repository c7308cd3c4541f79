//! CLI command implementations

pub mod common;
pub mod config;
pub mod lifecycle;
pub mod list;
pub mod plugin;
pub mod refresh;
pub mod version;
pub mod watch;
