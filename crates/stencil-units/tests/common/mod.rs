//! Common test utilities for stencil-units
//!
//! This module provides shared test infrastructure including:
//! - Constants for unit names, tags and versions
//! - Metadata builders and a ready-made orchestrator environment
//! - Mock registry and installer implementations
//! - Tarball fixtures and wiremock helpers for the HTTP-backed clients
//! - Assertion helpers for manifest state

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod assertions;
pub mod builders;
pub mod constants;
pub mod fixtures;
pub mod mock_server;
pub mod mocks;

pub use assertions::*;
pub use builders::*;
pub use constants::*;
pub use fixtures::*;
pub use mock_server::*;
pub use mocks::*;
