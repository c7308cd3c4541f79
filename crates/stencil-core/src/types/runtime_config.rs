//! Runtime configuration types for operational parameters
//!
//! These types define configuration that controls runtime behavior like
//! the registry endpoint, network timeouts, on-disk layout and refresh policy.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Registry endpoint and catalog packages
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Install roots and manifest store location
    #[serde(default)]
    pub paths: PathsConfig,

    /// Lifecycle timing
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Registry endpoint and catalog packages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// Base URL of the package registry
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Organisation scope (e.g. "@acme"); organisation templates are
    /// unavailable without it
    #[serde(default)]
    pub org_scope: Option<String>,

    /// Package listing template names
    #[serde(default = "default_templates_catalog")]
    pub templates_catalog: String,

    /// Package listing plugins
    #[serde(default = "default_plugins_catalog")]
    pub plugins_catalog: String,

    /// Keep plugins whose catalog origin is not "common"
    #[serde(default)]
    pub include_org_plugins: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            org_scope: None,
            templates_catalog: default_templates_catalog(),
            plugins_catalog: default_plugins_catalog(),
            include_org_plugins: false,
        }
    }
}

impl RegistryConfig {
    /// Registry URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_templates_catalog() -> String {
    "stencil-templates".to_string()
}

fn default_plugins_catalog() -> String {
    "stencil-plugins".to_string()
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Timeout for registry JSON requests in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Timeout for tarball downloads in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound on concurrent metadata fetches during a refresh
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            user_agent: default_user_agent(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("stencil/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_concurrent_fetches() -> usize {
    8
}

/// Filesystem locations; unset entries resolve under the Stencil home
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PathsConfig {
    /// Root for installed templates
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,

    /// Root for installed plugins
    #[serde(default)]
    pub plugins_dir: Option<PathBuf>,

    /// Directory holding the manifest store
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

/// [`PathsConfig`] with every location filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub templates_dir: PathBuf,
    pub plugins_dir: PathBuf,
    pub store_dir: PathBuf,
}

impl PathsConfig {
    /// Fill unset locations from `home`
    pub fn resolve(&self, home: &Path) -> ResolvedPaths {
        ResolvedPaths {
            templates_dir: self
                .templates_dir
                .clone()
                .unwrap_or_else(|| home.join("templates")),
            plugins_dir: self
                .plugins_dir
                .clone()
                .unwrap_or_else(|| home.join("plugins")),
            store_dir: self
                .store_dir
                .clone()
                .unwrap_or_else(|| home.join("store")),
        }
    }
}

/// Lifecycle timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LifecycleConfig {
    /// Pause between the uninstall and install halves of a reinstall
    #[serde(default = "default_reinstall_settle_ms")]
    pub reinstall_settle_ms: u64,

    /// Age after which a cached catalog is considered stale
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            reinstall_settle_ms: default_reinstall_settle_ms(),
            refresh_ttl_secs: default_refresh_ttl(),
        }
    }
}

fn default_reinstall_settle_ms() -> u64 {
    1000
}

fn default_refresh_ttl() -> u64 {
    3600
}
