//! Type definitions for Stencil units and runtime configuration

mod runtime_config;
mod unit_types;

pub use runtime_config::*;
pub use unit_types::*;
