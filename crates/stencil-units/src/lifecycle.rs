//! Unit lifecycle orchestration
//!
//! [`LifecycleOrchestrator`] is the caller-facing surface. Each operation
//! sequences the registry client, the archive installer and the manifest,
//! and answers with an [`Outcome`]. Failures are also broadcast as
//! [`UnitEvent::OperationFailed`].
//!
//! Per tag: `NotInstalled -> Installing -> Installed -> Updating -> Installed`,
//! `Installed -> Uninstalling -> NotInstalled`, and `Installed -> Reinstalling`.

use crate::archive::{ArchiveInstaller, TarballInstaller};
use crate::error::{UnitError, UnitResult};
use crate::events::{EventBus, EventEnvelope, Operation, UnitEvent};
use crate::layout::UnitLayout;
use crate::lock::OperationLocks;
use crate::manifest::ManifestStore;
use crate::outcome::Outcome;
use crate::reconcile::{entry_from_record, UnitReconciler};
use crate::registry::{
    CatalogEntry, CatalogPackages, CatalogScope, HttpRegistryClient, RegistryClient, TagMetadata,
};
use crate::store::FileStore;
use crate::version::needs_update;
use chrono::Utc;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stencil_core::types::{ResolvedPaths, RuntimeConfig, TagRecord, UnitRecord, UnitType, PLUGIN_TAG};
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};

/// Orchestrator tunables
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Registry base URL passed to every request
    pub registry_url: String,

    /// Upper bound on concurrent metadata fetches during a refresh
    pub max_concurrent_fetches: usize,

    /// Pause between the uninstall and install halves of a reinstall
    pub reinstall_settle: Duration,

    /// Keep plugins whose catalog origin is not "common"
    pub include_org_plugins: bool,

    /// Default staleness bound for `refresh_if_stale`
    pub refresh_ttl: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

impl From<&RuntimeConfig> for OrchestratorSettings {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            registry_url: config.registry.base_url().to_string(),
            max_concurrent_fetches: config.network.max_concurrent_fetches.max(1),
            reinstall_settle: Duration::from_millis(config.lifecycle.reinstall_settle_ms),
            include_org_plugins: config.registry.include_org_plugins,
            refresh_ttl: Duration::from_secs(config.lifecycle.refresh_ttl_secs),
        }
    }
}

#[derive(Clone)]
pub struct LifecycleOrchestrator {
    registry: Arc<dyn RegistryClient>,
    installer: Arc<dyn ArchiveInstaller>,
    manifest: ManifestStore,
    layout: UnitLayout,
    settings: OrchestratorSettings,
    reconciler: UnitReconciler,
    locks: OperationLocks,
    events: EventBus,
}

impl LifecycleOrchestrator {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        installer: Arc<dyn ArchiveInstaller>,
        manifest: ManifestStore,
        layout: UnitLayout,
        settings: OrchestratorSettings,
    ) -> Self {
        let reconciler = UnitReconciler::new(registry.clone(), layout.clone());
        Self {
            registry,
            installer,
            manifest,
            layout,
            settings,
            reconciler,
            locks: OperationLocks::new(),
            events: EventBus::default(),
        }
    }

    /// Wire the HTTP registry client, tarball installer and file store
    pub fn from_config(config: &RuntimeConfig, paths: &ResolvedPaths) -> UnitResult<Self> {
        let registry = HttpRegistryClient::with_timeout(
            CatalogPackages::from(&config.registry),
            Duration::from_secs(config.network.http_timeout_secs),
            &config.network.user_agent,
        )?;
        let installer = TarballInstaller::with_timeout(
            Duration::from_secs(config.network.download_timeout_secs),
            &config.network.user_agent,
        )?;
        let store = FileStore::open(&paths.store_dir)?;

        Ok(Self::new(
            Arc::new(registry),
            Arc::new(installer),
            ManifestStore::new(Arc::new(store)),
            UnitLayout::from_paths(paths),
            OrchestratorSettings::from(config),
        ))
    }

    pub fn manifest(&self) -> &ManifestStore {
        &self.manifest
    }

    pub fn layout(&self) -> &UnitLayout {
        &self.layout
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Receive lifecycle events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Cached collection, no network
    pub async fn get(&self, unit_type: UnitType) -> Outcome<Vec<UnitRecord>> {
        Outcome::Ok(self.manifest.read(unit_type))
    }

    /// Reconcile the whole catalog of a unit type and persist it.
    ///
    /// An unreachable catalog is not a failure: the cached collection is
    /// returned and a [`UnitEvent::CatalogUnavailable`] is published.
    pub async fn refresh(&self, unit_type: UnitType) -> Outcome<Vec<UnitRecord>> {
        let result = self.refresh_inner(unit_type).await;
        self.finish(Operation::Refresh, unit_type, None, None, result)
    }

    /// Refresh only when the last successful refresh is older than `max_age`
    pub async fn refresh_if_stale(
        &self,
        unit_type: UnitType,
        max_age: Duration,
    ) -> Outcome<Vec<UnitRecord>> {
        let stale = match self.manifest.last_refreshed(unit_type) {
            None => true,
            Some(at) => {
                let age = Utc::now().signed_duration_since(at);
                age.to_std().map(|age| age > max_age).unwrap_or(false)
            }
        };

        if stale {
            self.refresh(unit_type).await
        } else {
            debug!("{} catalog is fresh, serving cache", unit_type);
            self.get(unit_type).await
        }
    }

    /// Download and install a tag
    pub async fn install(&self, unit_type: UnitType, name: &str, tag: &str) -> Outcome<UnitRecord> {
        let result = async {
            let _guard = self.locks.acquire(unit_type, name, tag).await;
            self.install_locked(unit_type, name, tag).await
        }
        .await;

        if let Ok((record, true)) = &result {
            if let Some(version) = record.tag(tag).and_then(TagRecord::installed) {
                self.events.publish(UnitEvent::InstallCompleted {
                    unit_type,
                    name: name.to_string(),
                    tag: tag.to_string(),
                    version: version.to_string(),
                });
            }
        }
        let result = result.map(|(record, _)| record);
        self.finish(Operation::Install, unit_type, Some(name), Some(tag), result)
    }

    /// Replace an installed tag with what the registry currently serves
    pub async fn update(&self, unit_type: UnitType, name: &str, tag: &str) -> Outcome<UnitRecord> {
        let result = async {
            let _guard = self.locks.acquire(unit_type, name, tag).await;
            self.update_locked(unit_type, name, tag).await
        }
        .await;
        self.finish(Operation::Update, unit_type, Some(name), Some(tag), result)
    }

    /// Uninstall then install under one held lock
    pub async fn reinstall(
        &self,
        unit_type: UnitType,
        name: &str,
        tag: &str,
    ) -> Outcome<UnitRecord> {
        let result = async {
            let _guard = self.locks.acquire(unit_type, name, tag).await;
            self.uninstall_locked(unit_type, name, tag).await?;
            if !self.settings.reinstall_settle.is_zero() {
                tokio::time::sleep(self.settings.reinstall_settle).await;
            }
            let (record, _) = self.install_locked(unit_type, name, tag).await?;
            Ok(record)
        }
        .await;

        if let Ok(record) = &result {
            if let Some(version) = record.tag(tag).and_then(TagRecord::installed) {
                self.events.publish(UnitEvent::ReinstallCompleted {
                    unit_type,
                    name: name.to_string(),
                    tag: tag.to_string(),
                    version: version.to_string(),
                });
            }
        }
        self.finish(Operation::Reinstall, unit_type, Some(name), Some(tag), result)
    }

    /// Remove a tag from disk and mark it not installed
    pub async fn uninstall(
        &self,
        unit_type: UnitType,
        name: &str,
        tag: &str,
    ) -> Outcome<UnitRecord> {
        let result = async {
            let _guard = self.locks.acquire(unit_type, name, tag).await;
            self.uninstall_locked(unit_type, name, tag).await
        }
        .await;

        if result.is_ok() {
            self.events.publish(UnitEvent::UninstallCompleted {
                unit_type,
                name: name.to_string(),
                tag: tag.to_string(),
            });
        }
        self.finish(Operation::Uninstall, unit_type, Some(name), Some(tag), result)
    }

    /// Activate or deactivate an installed plugin
    pub async fn set_applied(&self, name: &str, applied: bool) -> Outcome<UnitRecord> {
        let result = self
            .manifest
            .update(UnitType::Plugin, |records| {
                let record = records
                    .iter_mut()
                    .find(|r| r.name == name)
                    .ok_or_else(|| UnitError::not_found(format!("plugin {}", name)))?;
                if applied && !record.is_installed() {
                    return Err(UnitError::not_found(format!(
                        "plugin {} is not installed",
                        name
                    )));
                }
                record.applied = applied;
                record.loading = false;
                Ok(record.clone())
            })
            .await;

        if result.is_ok() {
            self.events.publish(UnitEvent::AppliedChanged {
                name: name.to_string(),
                applied,
            });
        }
        self.finish(
            Operation::SetApplied,
            UnitType::Plugin,
            Some(name),
            None,
            result,
        )
    }

    /// Log and broadcast failures, then wrap the result
    fn finish<T>(
        &self,
        operation: Operation,
        unit_type: UnitType,
        name: Option<&str>,
        tag: Option<&str>,
        result: UnitResult<T>,
    ) -> Outcome<T> {
        if let Err(e) = &result {
            warn!(
                "{} {} {}{} failed: {}",
                operation,
                unit_type,
                name.unwrap_or("*"),
                tag.map(|t| format!("@{}", t)).unwrap_or_default(),
                e
            );
            self.events.publish(UnitEvent::OperationFailed {
                operation,
                unit_type,
                name: name.map(str::to_string),
                tag: tag.map(str::to_string),
                kind: e.kind(),
                message: e.to_string(),
            });
        }
        Outcome::from(result)
    }

    async fn refresh_inner(&self, unit_type: UnitType) -> UnitResult<Vec<UnitRecord>> {
        let registry_url = self.settings.registry_url.as_str();
        let snapshot = self.manifest.read(unit_type);

        let catalog = match self
            .registry
            .fetch_catalog(registry_url, CatalogScope::for_unit_type(unit_type))
            .await
        {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("{} catalog unavailable, serving cache: {}", unit_type, e);
                self.events.publish(UnitEvent::CatalogUnavailable {
                    unit_type,
                    kind: e.kind(),
                    message: e.to_string(),
                });
                return Ok(snapshot
                    .into_iter()
                    .map(|mut record| {
                        record.loading = false;
                        record
                    })
                    .collect());
            }
        };

        // First occurrence of a name wins
        let mut listed = HashSet::new();
        let mut entries: Vec<CatalogEntry> = Vec::new();
        for entry in catalog.entries {
            if unit_type.is_plugin() && !self.settings.include_org_plugins && !entry.is_common() {
                debug!("Skipping organisation plugin {}", entry.name);
                continue;
            }
            if listed.insert(entry.name.clone()) {
                entries.push(entry);
            }
        }

        let by_name: HashMap<&str, &UnitRecord> =
            snapshot.iter().map(|r| (r.name.as_str(), r)).collect();

        // Installed units the catalog no longer lists: plugins keep being
        // checked, templates are kept as they are
        let mut kept = Vec::new();
        for record in &snapshot {
            if listed.contains(&record.name) || !record.is_installed() {
                continue;
            }
            if unit_type.is_plugin() {
                info!("Plugin {} is delisted but installed, keeping it", record.name);
                entries.push(entry_from_record(record));
            } else {
                info!("Template {} is delisted but installed, keeping it", record.name);
                let mut record = record.clone();
                record.loading = false;
                kept.push(record);
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_fetches.max(1)));
        let reconciled = join_all(entries.iter().map(|entry| {
            let semaphore = semaphore.clone();
            let cached = by_name.get(entry.name.as_str()).copied();
            async move {
                let _permit = semaphore.acquire().await.ok();
                self.reconciler
                    .reconcile(registry_url, unit_type, entry, cached)
                    .await
            }
        }))
        .await;

        let mut refreshed: Vec<UnitRecord> = reconciled.into_iter().flatten().collect();
        refreshed.extend(kept);

        let guard = self.manifest.lock(unit_type).await;
        let latest = self.manifest.read(unit_type);
        merge_concurrent_changes(&mut refreshed, &snapshot, &latest);
        self.manifest.write(unit_type, &refreshed)?;
        drop(guard);

        if let Err(e) = self.manifest.mark_refreshed(unit_type, Utc::now()) {
            warn!("Failed to record refresh time for {}: {}", unit_type, e);
        }

        info!("Refreshed {} {} units", refreshed.len(), unit_type);
        self.events.publish(UnitEvent::RefreshCompleted {
            unit_type,
            units: refreshed.len(),
        });
        Ok(refreshed)
    }

    /// Install without taking the operation lock. Returns the record and
    /// whether anything was downloaded.
    async fn install_locked(
        &self,
        unit_type: UnitType,
        name: &str,
        tag: &str,
    ) -> UnitResult<(UnitRecord, bool)> {
        check_plugin_tag(unit_type, tag)?;
        let target = self.layout.tag_path(unit_type, name, tag)?;
        let cached = self
            .manifest
            .read(unit_type)
            .into_iter()
            .find(|r| r.name == name);

        if let Some(record) = &cached {
            let installed = record.tag(tag).is_some_and(TagRecord::is_installed);
            if installed && target.is_dir() {
                debug!("{} {}@{} is already installed", unit_type, name, tag);
                let mut record = record.clone();
                record.loading = false;
                return Ok((record, false));
            }
        }

        let registry_url = self.settings.registry_url.as_str();
        let meta = self
            .registry
            .fetch_tag_metadata(registry_url, name, tag)
            .await?;

        let template = match &cached {
            Some(record) => record.clone(),
            None => self.record_from_registry(unit_type, name).await,
        };

        if target.exists() {
            warn!("Removing stale directory {}", target.display());
            remove_dir(&target).await?;
        }

        info!("Installing {} {}@{} ({})", unit_type, name, tag, meta.version);
        self.installer
            .install_from(&meta.dist.tarball, meta.dist.integrity.as_deref(), &target)
            .await?;

        let persisted = self
            .manifest
            .update(unit_type, |records| {
                let record = upsert(records, template);
                mark_installed(record, tag, &meta, &target);
                Ok(record.clone())
            })
            .await;

        match persisted {
            Ok(record) => Ok((record, true)),
            Err(e) => {
                // Keep disk and manifest in agreement
                if let Err(cleanup) = remove_dir(&target).await {
                    warn!("Failed to remove {}: {}", target.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    async fn update_locked(
        &self,
        unit_type: UnitType,
        name: &str,
        tag: &str,
    ) -> UnitResult<UnitRecord> {
        check_plugin_tag(unit_type, tag)?;
        let live = self.layout.tag_path(unit_type, name, tag)?;
        let record = self
            .manifest
            .read(unit_type)
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| UnitError::not_found(format!("{} {}", unit_type, name)))?;
        let from_version = record
            .tag(tag)
            .and_then(TagRecord::installed)
            .map(str::to_string)
            .ok_or_else(|| UnitError::not_found(format!("{}@{} is not installed", name, tag)))?;
        if !live.is_dir() {
            return Err(UnitError::not_found(format!(
                "{}@{} is recorded as installed but {} is missing",
                name,
                tag,
                live.display()
            )));
        }

        let registry_url = self.settings.registry_url.as_str();
        let meta = self
            .registry
            .fetch_tag_metadata(registry_url, name, tag)
            .await?;

        let staging = self.layout.staging_path(unit_type, name, tag)?;
        let backup = self.layout.backup_path(unit_type, name, tag)?;
        if staging.exists() {
            remove_dir(&staging).await?;
        }

        info!(
            "Updating {} {}@{} {} -> {}",
            unit_type, name, tag, from_version, meta.version
        );
        if let Err(e) = self
            .installer
            .install_from(&meta.dist.tarball, meta.dist.integrity.as_deref(), &staging)
            .await
        {
            discard(&staging).await;
            return Err(e);
        }

        swap_into_place(&staging, &live, &backup).await?;

        let persisted = self
            .manifest
            .update(unit_type, |records| {
                let record = upsert(records, record);
                mark_installed(record, tag, &meta, &live);
                Ok(record.clone())
            })
            .await;

        let updated = match persisted {
            Ok(updated) => updated,
            Err(e) => {
                // Put the previous content back so it matches the manifest
                discard(&live).await;
                if let Err(restore) = tokio::fs::rename(&backup, &live).await {
                    warn!("Failed to restore {}: {}", live.display(), restore);
                }
                return Err(e);
            }
        };
        discard(&backup).await;

        self.events.publish(UnitEvent::UpdateCompleted {
            unit_type,
            name: name.to_string(),
            tag: tag.to_string(),
            from_version,
            to_version: meta.version.clone(),
        });
        Ok(updated)
    }

    async fn uninstall_locked(
        &self,
        unit_type: UnitType,
        name: &str,
        tag: &str,
    ) -> UnitResult<UnitRecord> {
        check_plugin_tag(unit_type, tag)?;
        let target = self.layout.tag_path(unit_type, name, tag)?;

        let exists = self
            .manifest
            .read(unit_type)
            .iter()
            .any(|r| r.name == name && r.tag(tag).is_some());
        if !exists {
            return Err(UnitError::not_found(format!("{} {}@{}", unit_type, name, tag)));
        }

        if target.exists() {
            info!("Removing {}", target.display());
            remove_dir(&target).await?;
        }

        self.manifest
            .update(unit_type, |records| {
                let record = records
                    .iter_mut()
                    .find(|r| r.name == name)
                    .ok_or_else(|| UnitError::not_found(format!("{} {}", unit_type, name)))?;
                if let Some(tag_record) = record.tag_mut(tag) {
                    tag_record.clear_install();
                }
                if unit_type.is_plugin() {
                    record.applied = false;
                }
                record.loading = false;
                Ok(record.clone())
            })
            .await
    }

    /// Build a record for a unit the manifest has never seen
    async fn record_from_registry(&self, unit_type: UnitType, name: &str) -> UnitRecord {
        let mut record = UnitRecord::new(name, unit_type);
        match self
            .registry
            .fetch_unit_metadata(&self.settings.registry_url, name)
            .await
        {
            Ok(metadata) => {
                record.description = metadata.description.clone();
                record.homepage = metadata.homepage.clone();
                record.tags = metadata
                    .release_tags(unit_type)
                    .into_iter()
                    .map(|(tag, version)| TagRecord::not_installed(tag, Some(version)))
                    .collect();
            }
            Err(e) => debug!("No package document for {}: {}", name, e),
        }
        record
    }
}

/// Plugins are tracked under a single tag
fn check_plugin_tag(unit_type: UnitType, tag: &str) -> UnitResult<()> {
    if unit_type.is_plugin() && tag != PLUGIN_TAG {
        return Err(UnitError::not_found(format!(
            "plugins only track the `{}` tag, not `{}`",
            PLUGIN_TAG, tag
        )));
    }
    Ok(())
}

/// Find `record` by name or append it; returns the stored record
fn upsert(records: &mut Vec<UnitRecord>, record: UnitRecord) -> &mut UnitRecord {
    let index = match records.iter().position(|r| r.name == record.name) {
        Some(index) => index,
        None => {
            records.push(record);
            records.len() - 1
        }
    };
    &mut records[index]
}

fn mark_installed(record: &mut UnitRecord, tag: &str, meta: &TagMetadata, path: &Path) {
    if record.tag(tag).is_none() {
        record.tags.push(TagRecord::not_installed(tag, None));
    }
    if let Some(tag_record) = record.tag_mut(tag) {
        tag_record.installed_version = meta.version.clone();
        tag_record.available_version = Some(meta.version.clone());
        tag_record.local_path = Some(path.to_path_buf());
        tag_record.needs_update = false;
    }
    record.loading = false;
}

/// Re-apply changes persisted while a refresh was in flight.
///
/// A record that differs from the refresh snapshot was touched by another
/// operation; its install state and `applied` flag win.
fn merge_concurrent_changes(
    refreshed: &mut Vec<UnitRecord>,
    snapshot: &[UnitRecord],
    latest: &[UnitRecord],
) {
    let before: HashMap<&str, &UnitRecord> =
        snapshot.iter().map(|r| (r.name.as_str(), r)).collect();

    for current in latest {
        if before.get(current.name.as_str()) == Some(&current) {
            continue;
        }

        match refreshed.iter_mut().find(|r| r.name == current.name) {
            Some(record) => {
                record.applied = current.applied;
                for tag in &mut record.tags {
                    if let Some(current_tag) = current.tag(&tag.tag_name) {
                        tag.installed_version = current_tag.installed_version.clone();
                        tag.local_path = current_tag.local_path.clone();
                        tag.needs_update = needs_update(
                            &tag.installed_version,
                            tag.available_version.as_deref(),
                        );
                    }
                }
            }
            None if current.is_installed() => {
                let mut record = current.clone();
                record.loading = false;
                refreshed.push(record);
            }
            None => {}
        }
    }
}

/// Move `staging` to `live`, keeping the old `live` at `backup` until the
/// caller removes it. A failed swap puts the old content back.
async fn swap_into_place(staging: &Path, live: &Path, backup: &Path) -> UnitResult<()> {
    if let Some(parent) = backup.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| UnitError::filesystem(parent, e))?;
    }
    if backup.exists() {
        remove_dir(backup).await?;
    }

    if let Err(e) = tokio::fs::rename(live, backup).await {
        discard(staging).await;
        return Err(UnitError::filesystem(live, e));
    }

    if let Err(e) = tokio::fs::rename(staging, live).await {
        if let Err(restore) = tokio::fs::rename(backup, live).await {
            warn!("Failed to restore {}: {}", live.display(), restore);
        }
        discard(staging).await;
        return Err(UnitError::filesystem(live, e));
    }

    Ok(())
}

async fn remove_dir(path: &Path) -> UnitResult<()> {
    let result = if tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UnitError::filesystem(path, e)),
    }
}

/// Best-effort removal
async fn discard(path: &Path) {
    if let Err(e) = remove_dir(path).await {
        warn!("Failed to clean up {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_core::types::{TemplateOrigin, NONE_VERSION};

    const OFFICIAL: UnitType = UnitType::Template(TemplateOrigin::Official);

    fn tag(name: &str, installed: &str, available: &str) -> TagRecord {
        TagRecord {
            tag_name: name.to_string(),
            local_path: None,
            installed_version: installed.to_string(),
            available_version: Some(available.to_string()),
            needs_update: needs_update(installed, Some(available)),
        }
    }

    fn record(name: &str, tags: Vec<TagRecord>) -> UnitRecord {
        let mut record = UnitRecord::new(name, OFFICIAL);
        record.tags = tags;
        record
    }

    #[test]
    fn test_concurrent_install_survives_refresh() {
        let snapshot = vec![record("widget", vec![tag("stable", NONE_VERSION, "1.2.0")])];
        let mut refreshed = vec![record("widget", vec![tag("stable", NONE_VERSION, "1.3.0")])];
        let latest = vec![record("widget", vec![tag("stable", "1.2.0", "1.2.0")])];

        merge_concurrent_changes(&mut refreshed, &snapshot, &latest);

        let stable = refreshed[0].tag("stable").unwrap();
        assert_eq!(stable.installed_version, "1.2.0");
        assert_eq!(stable.available_version.as_deref(), Some("1.3.0"));
        assert!(stable.needs_update);
    }

    #[test]
    fn test_unchanged_records_keep_refresh_view() {
        let snapshot = vec![record("widget", vec![tag("stable", NONE_VERSION, "1.2.0")])];
        let mut refreshed = vec![record("widget", vec![tag("stable", NONE_VERSION, "1.3.0")])];
        let latest = snapshot.clone();

        merge_concurrent_changes(&mut refreshed, &snapshot, &latest);
        assert_eq!(
            refreshed[0].tag("stable").unwrap().available_version.as_deref(),
            Some("1.3.0")
        );
    }

    #[test]
    fn test_unit_installed_during_refresh_is_kept() {
        let snapshot = vec![];
        let mut refreshed = vec![];
        let latest = vec![record("gadget", vec![tag("stable", "0.1.0", "0.1.0")])];

        merge_concurrent_changes(&mut refreshed, &snapshot, &latest);
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].name, "gadget");
    }

    #[test]
    fn test_upsert() {
        let mut records = vec![record("widget", vec![])];
        upsert(&mut records, record("widget", vec![tag("x", NONE_VERSION, "1.0.0")]));
        assert_eq!(records.len(), 1);
        assert!(records[0].tags.is_empty());

        upsert(&mut records, record("gadget", vec![]));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_check_plugin_tag() {
        assert!(check_plugin_tag(UnitType::Plugin, "latest").is_ok());
        assert!(check_plugin_tag(UnitType::Plugin, "beta").is_err());
        assert!(check_plugin_tag(OFFICIAL, "beta").is_ok());
    }

    #[tokio::test]
    async fn test_swap_into_place() {
        let temp = tempfile::TempDir::new().unwrap();
        let live = temp.path().join("widget-stable");
        let staging = temp.path().join(".staging/widget-stable");
        let backup = temp.path().join(".backup/widget-stable");
        std::fs::create_dir_all(&live).unwrap();
        std::fs::write(live.join("VERSION"), "1.2.0").unwrap();
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("VERSION"), "1.3.0").unwrap();

        swap_into_place(&staging, &live, &backup).await.unwrap();

        assert_eq!(std::fs::read_to_string(live.join("VERSION")).unwrap(), "1.3.0");
        assert_eq!(std::fs::read_to_string(backup.join("VERSION")).unwrap(), "1.2.0");
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn test_failed_swap_restores_live() {
        let temp = tempfile::TempDir::new().unwrap();
        let live = temp.path().join("widget-stable");
        let staging = temp.path().join(".staging/widget-stable");
        let backup = temp.path().join(".backup/widget-stable");
        std::fs::create_dir_all(&live).unwrap();
        std::fs::write(live.join("VERSION"), "1.2.0").unwrap();

        // Nothing staged: the second rename fails
        let result = swap_into_place(&staging, &live, &backup).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(live.join("VERSION")).unwrap(), "1.2.0");
        assert!(!backup.exists());
    }
}
