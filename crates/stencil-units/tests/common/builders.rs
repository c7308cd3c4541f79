//! Builders for registry documents and orchestrator environments

#![allow(dead_code)]

use super::constants::*;
use super::mocks::{mock_tarball_url, FixtureInstaller, MockRegistry};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stencil_units::layout::UnitLayout;
use stencil_units::lifecycle::{LifecycleOrchestrator, OrchestratorSettings};
use stencil_units::manifest::ManifestStore;
use stencil_units::registry::{DistInfo, UnitMetadata};
use stencil_units::store::{FileStore, KeyValueStore, MemoryStore};
use tempfile::TempDir;

/// Builder for [`UnitMetadata`]
pub struct MetadataBuilder {
    metadata: UnitMetadata,
}

impl MetadataBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            metadata: UnitMetadata {
                name: name.to_string(),
                description: None,
                homepage: None,
                dist_tags: Vec::new(),
                dists: HashMap::new(),
            },
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.metadata.description = Some(description.to_string());
        self
    }

    pub fn with_homepage(mut self, homepage: &str) -> Self {
        self.metadata.homepage = Some(homepage.to_string());
        self
    }

    /// Point `tag` at `version`, published at the mock tarball URL
    pub fn with_tag(mut self, tag: &str, version: &str) -> Self {
        self.metadata
            .dist_tags
            .push((tag.to_string(), version.to_string()));
        self.metadata.dists.insert(
            version.to_string(),
            DistInfo {
                tarball: mock_tarball_url(&self.metadata.name, version),
                integrity: None,
            },
        );
        self
    }

    pub fn build(self) -> UnitMetadata {
        self.metadata
    }
}

/// Orchestrator wired to mocks over a temporary home
pub struct TestEnv {
    pub temp: TempDir,
    pub registry: Arc<MockRegistry>,
    pub installer: Arc<FixtureInstaller>,
    pub store: Arc<dyn KeyValueStore>,
    pub orchestrator: LifecycleOrchestrator,
}

impl TestEnv {
    /// In-memory manifest, no reinstall pause
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: OrchestratorSettings) -> Self {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        Self::assemble(temp, store, settings)
    }

    /// Manifest persisted under the temporary home
    pub fn with_file_store() -> Self {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::open(temp.path().join("store")).unwrap());
        Self::assemble(temp, store, test_settings())
    }

    fn assemble(temp: TempDir, store: Arc<dyn KeyValueStore>, settings: OrchestratorSettings) -> Self {
        let registry = Arc::new(MockRegistry::new());
        let installer = Arc::new(FixtureInstaller::new());
        let layout = UnitLayout::new(temp.path().join("templates"), temp.path().join("plugins"));
        let orchestrator = LifecycleOrchestrator::new(
            registry.clone(),
            installer.clone(),
            ManifestStore::new(store.clone()),
            layout,
            settings,
        );

        Self {
            temp,
            registry,
            installer,
            store,
            orchestrator,
        }
    }

    /// Orchestrator over the same store and directories, as after a restart
    pub fn restarted(&self) -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(
            self.registry.clone(),
            self.installer.clone(),
            ManifestStore::new(self.store.clone()),
            self.orchestrator.layout().clone(),
            self.orchestrator.settings().clone(),
        )
    }

    pub fn templates_root(&self) -> PathBuf {
        self.temp.path().join("templates")
    }

    pub fn org_templates_root(&self) -> PathBuf {
        self.templates_root().join(".org")
    }

    pub fn plugins_root(&self) -> PathBuf {
        self.temp.path().join("plugins")
    }

    /// Register the `widget` template with `stable` at `version`
    pub fn with_widget(self, version: &str) -> Self {
        self.registry.set_unit(
            MetadataBuilder::new(WIDGET)
                .with_description("Widget boilerplate")
                .with_tag(LATEST, version)
                .with_tag(STABLE, version)
                .build(),
        );
        self.registry.set_catalog_names(
            stencil_units::registry::CatalogScope::OfficialTemplates,
            &[WIDGET],
        );
        self
    }
}

pub fn test_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        registry_url: MOCK_REGISTRY_URL.to_string(),
        max_concurrent_fetches: 4,
        reinstall_settle: Duration::ZERO,
        include_org_plugins: false,
        refresh_ttl: Duration::from_secs(3600),
    }
}
