//! Version comparison
//!
//! The registry reports plain semantic versions; anything else (including
//! the `"none"` sentinel) never counts as newer.

use semver::{BuildMetadata, Version};
use stencil_core::types::NONE_VERSION;

/// Parse a version, ignoring build metadata and a leading `v`
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NONE_VERSION {
        return None;
    }
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('='))
        .unwrap_or(trimmed);

    let mut version = Version::parse(trimmed).ok()?;
    version.build = BuildMetadata::EMPTY;
    Some(version)
}

/// Check whether `candidate` is strictly newer than `current`
pub fn is_newer(current: &str, candidate: &str) -> bool {
    match (parse_version(current), parse_version(candidate)) {
        (Some(current), Some(candidate)) => candidate > current,
        _ => false,
    }
}

/// Compute `needsUpdate` for an installed/available pair
pub fn needs_update(installed: &str, available: Option<&str>) -> bool {
    available.is_some_and(|available| is_newer(installed, available))
}
