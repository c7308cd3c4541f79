//! Test constants for stencil-units tests

#![allow(dead_code)]

use std::time::Duration;
use stencil_core::types::{TemplateOrigin, UnitType};

/// Upper bound for any single async test step
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry URL handed to mock clients
pub const MOCK_REGISTRY_URL: &str = "https://registry.test";

pub const OFFICIAL: UnitType = UnitType::Template(TemplateOrigin::Official);
pub const ORGANIZATION: UnitType = UnitType::Template(TemplateOrigin::Organization);
pub const PLUGIN: UnitType = UnitType::Plugin;

pub const WIDGET: &str = "widget";
pub const GADGET: &str = "gadget";
pub const LINT_PLUGIN: &str = "lint";

pub const STABLE: &str = "stable";
pub const BETA: &str = "beta";
pub const LATEST: &str = "latest";
