//! Version information for the stencil CLI

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Semantic version
    pub version: String,

    /// Git commit SHA (short), when provided at build time
    pub commit: Option<String>,

    pub os: String,
    pub arch: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("STENCIL_GIT_SHA").map(String::from),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// e.g. `stencil 0.4.0 (abc1234) linux/x86_64`
    pub fn display(&self) -> String {
        let mut parts = vec![format!("stencil {}", self.version)];
        if let Some(commit) = &self.commit {
            parts.push(format!("({})", commit));
        }
        parts.push(format!("{}/{}", self.os, self.arch));
        parts.join(" ")
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}
