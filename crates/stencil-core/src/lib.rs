//! # stencil-core
//!
//! Core library for Stencil providing:
//! - The unit data model (templates, plugins, release tags)
//! - Runtime configuration types and the hierarchical loader
//! - Shared error types and filesystem helpers

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use utils::get_home_dir;
