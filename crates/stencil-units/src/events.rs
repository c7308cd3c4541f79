use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stencil_core::types::UnitType;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::ErrorKind;

/// Default number of events buffered per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Caller-facing operations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Refresh,
    Install,
    Update,
    Reinstall,
    Uninstall,
    SetApplied,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Refresh => "refresh",
            Operation::Install => "install",
            Operation::Update => "update",
            Operation::Reinstall => "reinstall",
            Operation::Uninstall => "uninstall",
            Operation::SetApplied => "set_applied",
        };
        f.write_str(name)
    }
}

/// Unit lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitEvent {
    /// Catalog reconciled and persisted
    RefreshCompleted { unit_type: UnitType, units: usize },

    /// Catalog could not be fetched; cached records were served
    CatalogUnavailable {
        unit_type: UnitType,
        kind: ErrorKind,
        message: String,
    },

    /// Tag installed
    InstallCompleted {
        unit_type: UnitType,
        name: String,
        tag: String,
        version: String,
    },

    /// Tag replaced by a newer download
    UpdateCompleted {
        unit_type: UnitType,
        name: String,
        tag: String,
        from_version: String,
        to_version: String,
    },

    /// Tag removed and installed again
    ReinstallCompleted {
        unit_type: UnitType,
        name: String,
        tag: String,
        version: String,
    },

    /// Tag removed
    UninstallCompleted {
        unit_type: UnitType,
        name: String,
        tag: String,
    },

    /// Plugin activation toggled
    AppliedChanged { name: String, applied: bool },

    /// Any operation failed
    OperationFailed {
        operation: Operation,
        unit_type: UnitType,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        tag: Option<String>,
        kind: ErrorKind,
        message: String,
    },
}

/// Event metadata envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID (UUID v4)
    pub event_id: String,

    /// Event timestamp (UTC)
    pub timestamp: DateTime<Utc>,

    /// The actual event payload
    pub event: UnitEvent,
}

impl EventEnvelope {
    pub fn new(event: UnitEvent) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast channel of [`EventEnvelope`]s.
///
/// Publishing never blocks and never fails; with no subscribers events are
/// dropped, and slow subscribers observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: UnitEvent) {
        let envelope = EventEnvelope::new(event);
        if self.sender.send(envelope).is_err() {
            trace!("No event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}
