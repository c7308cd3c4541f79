//! Shared utility functions for Stencil crates

use anyhow::anyhow;
use std::path::PathBuf;

/// Name of the per-user state directory under the home directory
pub const STENCIL_DIR_NAME: &str = ".stencil";

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// sandboxed runs and containers with an overridden HOME stay consistent
/// with the shell that launched them.
pub fn get_home_dir() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Get the Stencil state directory
///
/// `STENCIL_HOME` wins over `~/.stencil`.
pub fn get_stencil_home() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("STENCIL_HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    Ok(get_home_dir()?.join(STENCIL_DIR_NAME))
}
