//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User config (~/.stencil/config.yaml, or an explicit file)
//! 3. Environment variables (STENCIL_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::{PathsConfig, RuntimeConfig};
use crate::utils::get_stencil_home;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// File name of the user config inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,

    /// Explicit config file that replaces `{config_dir}/config.yaml`
    config_file: Option<Utf8PathBuf>,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at the Stencil home directory
    pub fn new() -> Result<Self> {
        let home = get_stencil_home().map_err(|e| Error::invalid_config(e.to_string()))?;
        let config_dir = Utf8PathBuf::from_path_buf(home).map_err(|p| {
            Error::invalid_config(format!("Non UTF-8 config directory: {}", p.display()))
        })?;
        Ok(Self::with_dir(config_dir))
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self {
            config_dir,
            config_file: None,
        }
    }

    /// Read user settings from `path` instead of the config directory.
    /// Unlike the default location, an explicit file must exist.
    pub fn with_config_file(mut self, path: Utf8PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        // Start with embedded defaults
        let mut config = Self::load_embedded_config::<RuntimeConfig>("runtime-defaults.yaml")?;

        match &self.config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config_not_found(path.as_str()));
                }
                let file_config = self.load_yaml_file::<RuntimeConfig>(path)?;
                config = Self::merge_runtime_config(config, file_config);
            }
            None => {
                let path = self.config_dir.join(CONFIG_FILE_NAME);
                if path.exists() {
                    let file_config = self.load_yaml_file::<RuntimeConfig>(&path)?;
                    config = Self::merge_runtime_config(config, file_config);
                }
            }
        }

        // Apply environment variable overrides
        config = self.apply_env_overrides(config)?;

        Ok(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        let config: T = serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })?;

        Ok(config)
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        debug!("Loading config from {}", path);
        let content = fs::read_to_string(path)?;
        let config: T = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        Ok(config)
    }

    /// Merge two runtime configs (base is overridden by overlay)
    fn merge_runtime_config(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            registry: overlay.registry,
            network: overlay.network,
            paths: Self::merge_paths(base.paths, overlay.paths),
            lifecycle: overlay.lifecycle,
        }
    }

    /// Merge path settings field by field
    fn merge_paths(base: PathsConfig, overlay: PathsConfig) -> PathsConfig {
        PathsConfig {
            templates_dir: overlay.templates_dir.or(base.templates_dir),
            plugins_dir: overlay.plugins_dir.or(base.plugins_dir),
            store_dir: overlay.store_dir.or(base.store_dir),
        }
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(&self, mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Ok(val) = env::var("STENCIL_REGISTRY") {
            if !val.is_empty() {
                config.registry.url = val;
            }
        }

        if let Ok(val) = env::var("STENCIL_ORG_SCOPE") {
            config.registry.org_scope = if val.is_empty() { None } else { Some(val) };
        }

        // Network
        if let Ok(val) = env::var("STENCIL_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("STENCIL_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("STENCIL_DOWNLOAD_TIMEOUT_SECS") {
            config.network.download_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("STENCIL_DOWNLOAD_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("STENCIL_MAX_CONCURRENT_FETCHES") {
            let max: usize = val.parse().map_err(|_| {
                Error::invalid_config("STENCIL_MAX_CONCURRENT_FETCHES must be a valid number")
            })?;
            if max == 0 {
                return Err(Error::invalid_config(
                    "STENCIL_MAX_CONCURRENT_FETCHES must be at least 1",
                ));
            }
            config.network.max_concurrent_fetches = max;
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Path of the user config file this loader reads
    pub fn config_file(&self) -> Utf8PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| self.config_dir.join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_temp_loader() -> (HierarchicalConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir =
            Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("Invalid UTF-8 path");
        let loader = HierarchicalConfigLoader::with_dir(config_dir);
        (loader, temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_runtime_config_defaults() {
        let (loader, _temp) = create_temp_loader();
        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.registry.url, "https://registry.npmjs.org");
        assert_eq!(config.network.http_timeout_secs, 30);
        assert_eq!(config.lifecycle.refresh_ttl_secs, 3600);
    }

    #[test]
    #[serial]
    fn test_load_runtime_config_from_file() {
        let (loader, _temp) = create_temp_loader();

        let config_content = r#"
registry:
  url: "https://registry.example.com"
  org-scope: "@acme"
network:
  http-timeout-secs: 10
paths:
  plugins-dir: "/srv/stencil/plugins"
"#;
        fs::write(loader.config_file(), config_content).unwrap();

        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.registry.url, "https://registry.example.com");
        assert_eq!(config.registry.org_scope.as_deref(), Some("@acme"));
        assert_eq!(config.network.http_timeout_secs, 10);
        assert_eq!(config.network.max_concurrent_fetches, 8);
        assert_eq!(
            config.paths.plugins_dir,
            Some(PathBuf::from("/srv/stencil/plugins"))
        );
    }

    #[test]
    #[serial]
    fn test_explicit_config_file_must_exist() {
        let (loader, temp) = create_temp_loader();
        let missing = Utf8PathBuf::from_path_buf(temp.path().join("missing.yaml")).unwrap();
        let loader = loader.with_config_file(missing);

        let err = loader.load_runtime_config().unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_invalid_yaml_is_reported() {
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.config_file(), "network: [unterminated").unwrap();

        let err = loader.load_runtime_config().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("STENCIL_REGISTRY", "http://127.0.0.1:4873");
        env::set_var("STENCIL_ORG_SCOPE", "@env-org");
        env::set_var("STENCIL_HTTP_TIMEOUT_SECS", "3");
        env::set_var("STENCIL_MAX_CONCURRENT_FETCHES", "2");

        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.registry.url, "http://127.0.0.1:4873");
        assert_eq!(config.registry.org_scope.as_deref(), Some("@env-org"));
        assert_eq!(config.network.http_timeout_secs, 3);
        assert_eq!(config.network.max_concurrent_fetches, 2);

        env::remove_var("STENCIL_REGISTRY");
        env::remove_var("STENCIL_ORG_SCOPE");
        env::remove_var("STENCIL_HTTP_TIMEOUT_SECS");
        env::remove_var("STENCIL_MAX_CONCURRENT_FETCHES");
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("STENCIL_MAX_CONCURRENT_FETCHES", "0");
        let zero = loader.load_runtime_config();
        env::set_var("STENCIL_MAX_CONCURRENT_FETCHES", "lots");
        let garbage = loader.load_runtime_config();
        env::remove_var("STENCIL_MAX_CONCURRENT_FETCHES");

        assert!(zero.is_err());
        assert!(garbage.is_err());
    }

    #[test]
    fn test_merge_paths_keeps_base_when_unset() {
        let base = PathsConfig {
            templates_dir: Some(PathBuf::from("/base/templates")),
            ..Default::default()
        };
        let overlay = PathsConfig {
            store_dir: Some(PathBuf::from("/overlay/store")),
            ..Default::default()
        };

        let merged = HierarchicalConfigLoader::merge_paths(base, overlay);
        assert_eq!(merged.templates_dir, Some(PathBuf::from("/base/templates")));
        assert_eq!(merged.store_dir, Some(PathBuf::from("/overlay/store")));
        assert!(merged.plugins_dir.is_none());
    }
}
