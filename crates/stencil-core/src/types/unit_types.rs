//! Unit data model shared by the engine and its front ends
//!
//! A unit is an installable template or plugin sourced from the registry.
//! The persisted manifest is an ordered list of [`UnitRecord`]s per
//! [`UnitType`]; each record carries one [`TagRecord`] per release track.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Sentinel stored in `installed_version` for tags that are not on disk
pub const NONE_VERSION: &str = "none";

/// Implicit tag every plugin is tracked under
pub const PLUGIN_TAG: &str = "latest";

/// Where a template catalog comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateOrigin {
    /// Published by the project maintainers
    Official,
    /// Published under the configured organisation scope
    Organization,
}

/// Collection a unit belongs to; each has its own manifest document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnitType {
    Template(TemplateOrigin),
    Plugin,
}

impl UnitType {
    /// Every collection, in manifest order
    pub const ALL: [UnitType; 3] = [
        UnitType::Template(TemplateOrigin::Official),
        UnitType::Template(TemplateOrigin::Organization),
        UnitType::Plugin,
    ];

    /// Stable key used for persistence and on the command line
    pub fn key(&self) -> &'static str {
        match self {
            UnitType::Template(TemplateOrigin::Official) => "official",
            UnitType::Template(TemplateOrigin::Organization) => "organization",
            UnitType::Plugin => "plugin",
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, UnitType::Template(_))
    }

    pub fn is_plugin(&self) -> bool {
        matches!(self, UnitType::Plugin)
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for UnitType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "official" => Ok(UnitType::Template(TemplateOrigin::Official)),
            "organization" | "org" => Ok(UnitType::Template(TemplateOrigin::Organization)),
            "plugin" | "plugins" => Ok(UnitType::Plugin),
            other => Err(Error::invalid_unit_type(other)),
        }
    }
}

impl TryFrom<String> for UnitType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UnitType> for String {
    fn from(value: UnitType) -> Self {
        value.key().to_string()
    }
}

/// Install state of one release track of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    /// Release track name (e.g. "latest", "beta")
    pub tag_name: String,

    /// Where the tag's content lives on disk, if installed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,

    /// Installed version, or [`NONE_VERSION`]
    pub installed_version: String,

    /// Version last reported by the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_version: Option<String>,

    /// Whether `available_version` is newer than `installed_version`
    #[serde(default)]
    pub needs_update: bool,
}

impl TagRecord {
    /// A tag known to the registry but not installed locally
    pub fn not_installed(tag_name: impl Into<String>, available_version: Option<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            local_path: None,
            installed_version: NONE_VERSION.to_string(),
            available_version,
            needs_update: false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed_version != NONE_VERSION
    }

    /// Installed version, `None` for the sentinel
    pub fn installed(&self) -> Option<&str> {
        self.is_installed().then_some(self.installed_version.as_str())
    }

    /// Reset to the not-installed state, keeping the registry view
    pub fn clear_install(&mut self) {
        self.local_path = None;
        self.installed_version = NONE_VERSION.to_string();
        self.needs_update = false;
    }
}

/// One installable unit (template or plugin)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    /// Registry package name; unique within its collection
    pub name: String,

    pub unit_type: UnitType,

    /// Release tracks in registry order
    #[serde(default)]
    pub tags: Vec<TagRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    /// Catalog origin label (plugins)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Catalog kind label, e.g. "ui" (plugins)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Activated for the current project (plugins)
    #[serde(default)]
    pub applied: bool,

    /// Transient UI flag; cleared by every completed operation
    #[serde(default)]
    pub loading: bool,
}

impl UnitRecord {
    /// Create a record with no tags
    pub fn new(name: impl Into<String>, unit_type: UnitType) -> Self {
        Self {
            name: name.into(),
            unit_type,
            tags: Vec::new(),
            description: None,
            homepage: None,
            origin: None,
            kind: None,
            applied: false,
            loading: false,
        }
    }

    pub fn tag(&self, tag_name: &str) -> Option<&TagRecord> {
        self.tags.iter().find(|t| t.tag_name == tag_name)
    }

    pub fn tag_mut(&mut self, tag_name: &str) -> Option<&mut TagRecord> {
        self.tags.iter_mut().find(|t| t.tag_name == tag_name)
    }

    /// True when at least one tag is installed
    pub fn is_installed(&self) -> bool {
        self.tags.iter().any(TagRecord::is_installed)
    }
}
