//! Unit synchronization and lifecycle for Stencil
//!
//! This crate handles:
//! - Registry catalogs and package documents
//! - Reconciling the cached manifest with the registry and the disk
//! - Tarball download, integrity checks and extraction
//! - Install, update, reinstall and uninstall of unit tags
//! - Lifecycle events and background refresh

pub mod archive;
pub mod error;
pub mod events;
pub mod layout;
pub mod lifecycle;
pub mod lock;
pub mod manifest;
pub mod outcome;
pub mod reconcile;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod version;

pub use archive::{ArchiveInstaller, TarballInstaller};
pub use error::{ErrorKind, UnitError, UnitResult};
pub use events::{EventBus, EventEnvelope, Operation, UnitEvent};
pub use layout::UnitLayout;
pub use lifecycle::{LifecycleOrchestrator, OrchestratorSettings};
pub use lock::OperationLocks;
pub use manifest::ManifestStore;
pub use outcome::{Outcome, OutcomeError};
pub use reconcile::UnitReconciler;
pub use registry::{
    Catalog, CatalogEntry, CatalogPackages, CatalogScope, DistInfo, HttpRegistryClient,
    RegistryClient, TagMetadata, UnitMetadata,
};
pub use scheduler::RefreshScheduler;
pub use store::{FileStore, KeyValueStore, MemoryStore};
