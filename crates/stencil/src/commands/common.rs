//! Shared plumbing for commands that drive the orchestrator

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use stencil_core::types::{ResolvedPaths, RuntimeConfig, UnitType, PLUGIN_TAG};
use stencil_core::HierarchicalConfigLoader;
use stencil_units::{LifecycleOrchestrator, Outcome};

use crate::output;

/// Loaded configuration with every path resolved
pub struct Settings {
    pub loader: HierarchicalConfigLoader,
    pub config: RuntimeConfig,
    pub paths: ResolvedPaths,
}

pub fn load_settings(config_path: Option<&Utf8Path>) -> Result<Settings> {
    let mut loader = HierarchicalConfigLoader::new().context("Failed to locate Stencil home")?;
    if let Some(path) = config_path {
        loader = loader.with_config_file(path.to_path_buf());
    }

    let config = loader
        .load_runtime_config()
        .with_context(|| format!("Failed to load {}", loader.config_file()))?;
    let paths = config.paths.resolve(loader.config_dir().as_std_path());

    Ok(Settings {
        loader,
        config,
        paths,
    })
}

pub fn orchestrator(config_path: Option<&Utf8Path>) -> Result<LifecycleOrchestrator> {
    let settings = load_settings(config_path)?;
    LifecycleOrchestrator::from_config(&settings.config, &settings.paths)
        .context("Failed to initialise the unit manager")
}

/// Turn an outcome into a `Result`, printing it first in JSON mode
pub fn finish<T: serde::Serialize>(outcome: Outcome<T>, json: bool) -> Result<T> {
    if json {
        output::json(&outcome)?;
    }
    outcome.into_result().map_err(|e| anyhow!(e))
}

/// Tag to operate on when `--tag` is omitted
pub fn resolve_tag(
    orchestrator: &LifecycleOrchestrator,
    unit_type: UnitType,
    name: &str,
    tag: Option<String>,
) -> Result<String> {
    if let Some(tag) = tag {
        return Ok(tag);
    }
    if unit_type.is_plugin() {
        return Ok(PLUGIN_TAG.to_string());
    }

    orchestrator
        .manifest()
        .read(unit_type)
        .into_iter()
        .find(|r| r.name == name)
        .and_then(|r| r.tags.first().map(|t| t.tag_name.clone()))
        .ok_or_else(|| {
            anyhow!(
                "No cached tags for {} {}; run `stencil refresh --type {}` or pass --tag",
                unit_type,
                name,
                unit_type
            )
        })
}
