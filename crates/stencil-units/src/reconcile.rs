//! Per-unit reconciliation of registry metadata with the cached record
//!
//! The cached manifest is trusted for installed versions; the disk only
//! tells whether a tag is still present. A directory with no recorded
//! version is reported as not installed.

use crate::layout::UnitLayout;
use crate::registry::{CatalogEntry, RegistryClient, UnitMetadata};
use crate::version::needs_update;
use std::sync::Arc;
use stencil_core::types::{TagRecord, UnitRecord, UnitType};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct UnitReconciler {
    registry: Arc<dyn RegistryClient>,
    layout: UnitLayout,
}

impl UnitReconciler {
    pub fn new(registry: Arc<dyn RegistryClient>, layout: UnitLayout) -> Self {
        Self { registry, layout }
    }

    /// Produce the up-to-date record for one catalog entry.
    ///
    /// When the registry cannot be read the cached record is returned as is
    /// (with `loading` cleared); with no cached record the unit is skipped.
    pub async fn reconcile(
        &self,
        registry_url: &str,
        unit_type: UnitType,
        entry: &CatalogEntry,
        cached: Option<&UnitRecord>,
    ) -> Option<UnitRecord> {
        match self
            .registry
            .fetch_unit_metadata(registry_url, &entry.name)
            .await
        {
            Ok(metadata) => merge_metadata(&self.layout, unit_type, entry, cached, &metadata),
            Err(e) => {
                match cached {
                    Some(_) => warn!("Keeping cached {} {}: {}", unit_type, entry.name, e),
                    None => warn!("Skipping {} {}: {}", unit_type, entry.name, e),
                }
                cached.cloned().map(|mut record| {
                    record.loading = false;
                    record
                })
            }
        }
    }
}

/// Combine registry metadata with the cached record and the disk.
///
/// Returns `None` only when the unit name cannot be laid out on disk.
pub fn merge_metadata(
    layout: &UnitLayout,
    unit_type: UnitType,
    entry: &CatalogEntry,
    cached: Option<&UnitRecord>,
    metadata: &UnitMetadata,
) -> Option<UnitRecord> {
    let mut tags = Vec::new();

    for (tag_name, available) in metadata.release_tags(unit_type) {
        let path = match layout.tag_path(unit_type, &entry.name, &tag_name) {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping {} {}: {}", unit_type, entry.name, e);
                return None;
            }
        };

        let cached_tag = cached.and_then(|record| record.tag(&tag_name));
        let recorded = cached_tag.and_then(TagRecord::installed);
        let on_disk = path.is_dir();

        let tag = match (on_disk, recorded) {
            (true, Some(installed)) => TagRecord {
                needs_update: needs_update(installed, Some(available.as_str())),
                installed_version: installed.to_string(),
                local_path: Some(path),
                available_version: Some(available),
                tag_name,
            },
            (true, None) => {
                warn!(
                    "Orphaned directory {} has no recorded version, treating as not installed",
                    path.display()
                );
                TagRecord::not_installed(tag_name, Some(available))
            }
            (false, installed) => {
                if installed.is_some() {
                    debug!(
                        "{} is recorded as installed but missing from disk",
                        path.display()
                    );
                }
                TagRecord::not_installed(tag_name, Some(available))
            }
        };
        tags.push(tag);
    }

    let mut record = UnitRecord::new(entry.name.clone(), unit_type);
    record.tags = tags;
    record.description = metadata
        .description
        .clone()
        .or_else(|| entry.description.clone())
        .or_else(|| cached.and_then(|c| c.description.clone()));
    record.homepage = metadata
        .homepage
        .clone()
        .or_else(|| cached.and_then(|c| c.homepage.clone()));
    record.origin = entry
        .origin
        .clone()
        .or_else(|| cached.and_then(|c| c.origin.clone()));
    record.kind = entry
        .kind
        .clone()
        .or_else(|| cached.and_then(|c| c.kind.clone()));
    // Only an installed unit stays applied
    record.applied = cached.is_some_and(|c| c.applied) && record.is_installed();
    record.loading = false;

    Some(record)
}

/// Catalog entry standing in for a cached record the catalog no longer lists
pub fn entry_from_record(record: &UnitRecord) -> CatalogEntry {
    CatalogEntry {
        name: record.name.clone(),
        origin: record.origin.clone(),
        kind: record.kind.clone(),
        description: record.description.clone(),
    }
}
