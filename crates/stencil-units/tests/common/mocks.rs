//! Mock implementations for testing
//!
//! Provides in-memory registry and installer implementations so lifecycle
//! tests run without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stencil_units::archive::ArchiveInstaller;
use stencil_units::error::{UnitError, UnitResult};
use stencil_units::registry::{
    Catalog, CatalogEntry, CatalogScope, DistInfo, RegistryClient, TagMetadata, UnitMetadata,
};

/// Tarball URL served by [`MockRegistry`] for a unit version
pub fn mock_tarball_url(name: &str, version: &str) -> String {
    format!("mock://{}/{}", name, version)
}

/// Registry backed by in-memory documents.
///
/// Catalogs that were never set fail with a network error, unknown units
/// are `NotFound`.
#[derive(Default)]
pub struct MockRegistry {
    catalogs: Mutex<HashMap<CatalogScope, Catalog>>,
    units: Mutex<HashMap<String, UnitMetadata>>,
    failing_units: Mutex<HashSet<String>>,
    metadata_delay: Mutex<Option<Duration>>,
    pub catalog_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
    pub tag_calls: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_catalog(&self, scope: CatalogScope, entries: Vec<CatalogEntry>) {
        self.catalogs
            .lock()
            .unwrap()
            .insert(scope, Catalog { entries });
    }

    pub fn set_catalog_names(&self, scope: CatalogScope, names: &[&str]) {
        self.set_catalog(scope, names.iter().map(|n| CatalogEntry::named(*n)).collect());
    }

    pub fn remove_catalog(&self, scope: CatalogScope) {
        self.catalogs.lock().unwrap().remove(&scope);
    }

    pub fn set_unit(&self, metadata: UnitMetadata) {
        self.units
            .lock()
            .unwrap()
            .insert(metadata.name.clone(), metadata);
    }

    /// Point a tag at a new version
    pub fn publish(&self, name: &str, tag: &str, version: &str) {
        let mut units = self.units.lock().unwrap();
        let metadata = units
            .get_mut(name)
            .unwrap_or_else(|| panic!("unit {} not registered", name));
        match metadata.dist_tags.iter_mut().find(|(t, _)| t == tag) {
            Some(entry) => entry.1 = version.to_string(),
            None => metadata
                .dist_tags
                .push((tag.to_string(), version.to_string())),
        }
        metadata.dists.insert(
            version.to_string(),
            DistInfo {
                tarball: mock_tarball_url(name, version),
                integrity: None,
            },
        );
    }

    /// Make package document requests for `name` fail with a network error
    pub fn fail_unit(&self, name: &str) {
        self.failing_units.lock().unwrap().insert(name.to_string());
    }

    pub fn restore_unit(&self, name: &str) {
        self.failing_units.lock().unwrap().remove(name);
    }

    pub fn set_metadata_delay(&self, delay: Duration) {
        *self.metadata_delay.lock().unwrap() = Some(delay);
    }

    fn check_unit(&self, name: &str) -> UnitResult<UnitMetadata> {
        if self.failing_units.lock().unwrap().contains(name) {
            return Err(UnitError::network(
                format!("mock://{}", name),
                "connection reset",
            ));
        }
        self.units
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| UnitError::not_found(name))
    }
}

#[async_trait]
impl RegistryClient for MockRegistry {
    async fn fetch_catalog(&self, _registry_url: &str, scope: CatalogScope) -> UnitResult<Catalog> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.catalogs
            .lock()
            .unwrap()
            .get(&scope)
            .cloned()
            .ok_or_else(|| UnitError::network(format!("mock://catalog/{:?}", scope), "offline"))
    }

    async fn fetch_unit_metadata(
        &self,
        _registry_url: &str,
        name: &str,
    ) -> UnitResult<UnitMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.metadata_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_unit(name)
    }

    async fn fetch_tag_metadata(
        &self,
        _registry_url: &str,
        name: &str,
        tag: &str,
    ) -> UnitResult<TagMetadata> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        let metadata = self.check_unit(name)?;
        let version = metadata
            .version_for(tag)
            .ok_or_else(|| UnitError::not_found(format!("{}@{}", name, tag)))?
            .to_string();
        let dist = metadata
            .dists
            .get(&version)
            .cloned()
            .unwrap_or_else(|| DistInfo {
                tarball: mock_tarball_url(name, &version),
                integrity: None,
            });
        Ok(TagMetadata { version, dist })
    }
}

/// Installer that writes a small fixture tree instead of downloading.
///
/// The target gets a `VERSION` file holding the last URL segment and a
/// `SOURCE` file holding the URL.
#[derive(Default)]
pub struct FixtureInstaller {
    failing_urls: Mutex<HashSet<String>>,
    interrupted_urls: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    active: Mutex<HashMap<String, usize>>,
    installs: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
    pub peak_per_target: AtomicUsize,
    pub peak_overall: AtomicUsize,
    running: AtomicUsize,
}

impl FixtureInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    /// Write part of the tree for `url`, then fail with an I/O error
    pub fn interrupt_url(&self, url: &str) {
        self.interrupted_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// URLs installed successfully, in order
    pub fn installs(&self) -> Vec<String> {
        self.installs.lock().unwrap().clone()
    }

    fn enter(&self, target: &str) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_overall.fetch_max(now, Ordering::SeqCst);

        let mut active = self.active.lock().unwrap();
        let count = active.entry(target.to_string()).or_insert(0);
        *count += 1;
        self.peak_per_target.fetch_max(*count, Ordering::SeqCst);
    }

    fn leave(&self, target: &str) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        if let Some(count) = self.active.lock().unwrap().get_mut(target) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl ArchiveInstaller for FixtureInstaller {
    async fn install_from(
        &self,
        url: &str,
        _integrity: Option<&str>,
        target_dir: &Path,
    ) -> UnitResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = target_dir.display().to_string();
        self.enter(&key);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing_urls.lock().unwrap().contains(url) {
            Err(UnitError::network(url, "connection reset"))
        } else if self.interrupted_urls.lock().unwrap().contains(url) {
            write_partial_fixture(url, target_dir)
        } else {
            write_fixture(url, target_dir)
        };

        self.leave(&key);
        if result.is_ok() {
            self.installs.lock().unwrap().push(url.to_string());
        }
        result
    }
}

fn write_fixture(url: &str, target_dir: &Path) -> UnitResult<()> {
    let version = url.rsplit('/').next().unwrap_or(url);
    std::fs::create_dir_all(target_dir).map_err(|e| UnitError::filesystem(target_dir, e))?;
    std::fs::write(target_dir.join("VERSION"), version)
        .map_err(|e| UnitError::filesystem(target_dir, e))?;
    std::fs::write(target_dir.join("SOURCE"), url)
        .map_err(|e| UnitError::filesystem(target_dir, e))?;
    Ok(())
}

fn write_partial_fixture(url: &str, target_dir: &Path) -> UnitResult<()> {
    std::fs::create_dir_all(target_dir.join("src"))
        .map_err(|e| UnitError::filesystem(target_dir, e))?;
    std::fs::write(target_dir.join("SOURCE"), url)
        .map_err(|e| UnitError::filesystem(target_dir, e))?;
    Err(UnitError::filesystem(
        target_dir.join("VERSION"),
        std::io::Error::new(std::io::ErrorKind::StorageFull, "no space left on device"),
    ))
}

/// Shared handles to the mocks behind an orchestrator
pub type SharedRegistry = Arc<MockRegistry>;
pub type SharedInstaller = Arc<FixtureInstaller>;
