//! Registry access
//!
//! Units are published as packages on an npm-style registry. Three
//! documents are consumed:
//!
//! 1. Catalog: `GET {registry}/{scope}{catalog}/latest`, the latest version
//!    of a package whose manifest lists unit names under `templates` or
//!    `plugins`
//! 2. Package document: `GET {registry}/{name}` with `dist-tags`, per-version
//!    tarball URLs, description and repository
//! 3. Tag document: `GET {registry}/{name}/{tag}` with the version a tag
//!    currently points at and its tarball
//!
//! The registry URL is passed per call so a changed setting applies to the
//! next request without rebuilding the client.

use crate::error::{UnitError, UnitResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use stencil_core::types::{RegistryConfig, TemplateOrigin, UnitType, PLUGIN_TAG};
use tracing::debug;

/// Default HTTP request timeout (30 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which catalog document to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogScope {
    OfficialTemplates,
    OrganizationTemplates,
    Plugins,
}

impl CatalogScope {
    pub fn for_unit_type(unit_type: UnitType) -> Self {
        match unit_type {
            UnitType::Template(TemplateOrigin::Official) => CatalogScope::OfficialTemplates,
            UnitType::Template(TemplateOrigin::Organization) => {
                CatalogScope::OrganizationTemplates
            }
            UnitType::Plugin => CatalogScope::Plugins,
        }
    }

    /// Field of the catalog document holding the entries
    fn list_field(&self) -> &'static str {
        match self {
            CatalogScope::OfficialTemplates | CatalogScope::OrganizationTemplates => "templates",
            CatalogScope::Plugins => "plugins",
        }
    }
}

/// Catalog package names, with the organisation scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPackages {
    pub templates: String,
    pub plugins: String,
    pub org_scope: Option<String>,
}

impl Default for CatalogPackages {
    fn default() -> Self {
        Self::from(&RegistryConfig::default())
    }
}

impl From<&RegistryConfig> for CatalogPackages {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            templates: config.templates_catalog.clone(),
            plugins: config.plugins_catalog.clone(),
            org_scope: config.org_scope.clone(),
        }
    }
}

impl CatalogPackages {
    /// Package path for a scope, e.g. `@acme/stencil-templates`
    pub fn package_for(&self, scope: CatalogScope) -> UnitResult<String> {
        match scope {
            CatalogScope::OfficialTemplates => Ok(self.templates.clone()),
            CatalogScope::Plugins => Ok(self.plugins.clone()),
            CatalogScope::OrganizationTemplates => {
                let org = self
                    .org_scope
                    .as_deref()
                    .map(|s| s.trim().trim_end_matches('/'))
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| UnitError::not_found("organisation scope is not configured"))?;
                let org = if org.starts_with('@') {
                    org.to_string()
                } else {
                    format!("@{}", org)
                };
                Ok(format!("{}/{}", org, self.templates))
            }
        }
    }
}

/// One catalog listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub name: String,

    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl CatalogEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
            kind: None,
            description: None,
        }
    }

    /// Public plugins carry no origin or the `common` origin
    pub fn is_common(&self) -> bool {
        self.origin.as_deref().is_none_or(|origin| origin == "common")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCatalogEntry {
    Name(String),
    Entry(CatalogEntry),
}

impl From<RawCatalogEntry> for CatalogEntry {
    fn from(raw: RawCatalogEntry) -> Self {
        match raw {
            RawCatalogEntry::Name(name) => CatalogEntry::named(name),
            RawCatalogEntry::Entry(entry) => entry,
        }
    }
}

/// Remote catalog in registry order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

/// Archive location of one published version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DistInfo {
    pub tarball: String,

    /// Subresource integrity string, e.g. `sha512-<base64>`
    #[serde(default)]
    pub integrity: Option<String>,
}

/// Package document digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMetadata {
    pub name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,

    /// `(tag, version)` in document order
    pub dist_tags: Vec<(String, String)>,

    /// Per-version archives
    pub dists: HashMap<String, DistInfo>,
}

impl UnitMetadata {
    /// Version a tag points at
    pub fn version_for(&self, tag: &str) -> Option<&str> {
        self.dist_tags
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, version)| version.as_str())
    }

    /// Release tracks offered for a unit type.
    ///
    /// Plugins follow `latest` only. Templates expose every other tag and
    /// fall back to `latest` when it is the only one published.
    pub fn release_tags(&self, unit_type: UnitType) -> Vec<(String, String)> {
        if unit_type.is_plugin() {
            return self
                .version_for(PLUGIN_TAG)
                .map(|v| vec![(PLUGIN_TAG.to_string(), v.to_string())])
                .unwrap_or_default();
        }

        let tracks: Vec<(String, String)> = self
            .dist_tags
            .iter()
            .filter(|(tag, _)| tag != PLUGIN_TAG)
            .cloned()
            .collect();
        if tracks.is_empty() {
            self.dist_tags.clone()
        } else {
            tracks
        }
    }

    /// Tarball URL for a tag/version, or the registry's conventional path
    pub fn download_url_for(&self, registry_url: &str, tag: &str, version: Option<&str>) -> String {
        let version = version.or_else(|| self.version_for(tag));
        if let Some(dist) = version.and_then(|v| self.dists.get(v)) {
            return dist.tarball.clone();
        }

        let version = version.unwrap_or(tag);
        let base = self.name.rsplit('/').next().unwrap_or(&self.name);
        format!(
            "{}/{}/-/{}-{}.tgz",
            registry_url.trim_end_matches('/'),
            self.name,
            base,
            version
        )
    }
}

/// Tag document: what a tag points at right now
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagMetadata {
    pub version: String,
    pub dist: DistInfo,
}

/// Remote source of catalogs and unit metadata
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn fetch_catalog(&self, registry_url: &str, scope: CatalogScope) -> UnitResult<Catalog>;

    async fn fetch_unit_metadata(&self, registry_url: &str, name: &str)
        -> UnitResult<UnitMetadata>;

    async fn fetch_tag_metadata(
        &self,
        registry_url: &str,
        name: &str,
        tag: &str,
    ) -> UnitResult<TagMetadata>;
}

/// Strip `git+` and `.git` from a repository URL
pub fn normalize_homepage(repository_url: &str) -> Option<String> {
    let url = repository_url.trim();
    let url = url.strip_prefix("git+").unwrap_or(url);
    let url = url.strip_suffix(".git").unwrap_or(url);
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

#[derive(Deserialize)]
struct RawPackageDocument {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    repository: Option<RawRepository>,
    #[serde(default, rename = "dist-tags")]
    dist_tags: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    versions: HashMap<String, RawVersion>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRepository {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

#[derive(Deserialize)]
struct RawVersion {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dist: Option<DistInfo>,
}

impl From<RawPackageDocument> for UnitMetadata {
    fn from(doc: RawPackageDocument) -> Self {
        let dist_tags: Vec<(String, String)> = doc
            .dist_tags
            .into_iter()
            .filter_map(|(tag, version)| version.as_str().map(|v| (tag, v.to_string())))
            .collect();

        // Top-level description, else the one of the last tagged version
        let description = doc.description.filter(|d| !d.is_empty()).or_else(|| {
            dist_tags
                .iter()
                .rev()
                .find_map(|(_, v)| doc.versions.get(v).and_then(|v| v.description.clone()))
        });

        let homepage = match doc.repository {
            Some(RawRepository::Url(url)) => normalize_homepage(&url),
            Some(RawRepository::Object { url: Some(url) }) => normalize_homepage(&url),
            _ => None,
        }
        .or(doc.homepage);

        Self {
            name: doc.name,
            description,
            homepage,
            dist_tags,
            dists: doc
                .versions
                .into_iter()
                .filter_map(|(version, raw)| raw.dist.map(|dist| (version, dist)))
                .collect(),
        }
    }
}

/// reqwest-backed [`RegistryClient`]
#[derive(Clone)]
pub struct HttpRegistryClient {
    client: reqwest::Client,
    timeout: Duration,
    packages: CatalogPackages,
}

impl std::fmt::Debug for HttpRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryClient")
            .field("timeout", &self.timeout)
            .field("packages", &self.packages)
            .finish()
    }
}

impl HttpRegistryClient {
    /// Create a client with the default timeout
    pub fn new(packages: CatalogPackages) -> UnitResult<Self> {
        Self::with_timeout(
            packages,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concat!("stencil/", env!("CARGO_PKG_VERSION")),
        )
    }

    /// Create a client with a custom timeout and user agent
    pub fn with_timeout(
        packages: CatalogPackages,
        timeout: Duration,
        user_agent: &str,
    ) -> UnitResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| UnitError::network("<client>", e))?;

        Ok(Self {
            client,
            timeout,
            packages,
        })
    }

    /// GET a JSON document, mapping transport and status failures
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> UnitResult<T> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                UnitError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                UnitError::network(url, e)
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(UnitError::not_found(url));
        }
        if !status.is_success() {
            return Err(UnitError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UnitError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                UnitError::network(url, e)
            }
        })?;

        serde_json::from_slice(&body).map_err(|e| UnitError::decode(url, e))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch_catalog(&self, registry_url: &str, scope: CatalogScope) -> UnitResult<Catalog> {
        let package = self.packages.package_for(scope)?;
        let url = format!("{}/{}/latest", registry_url.trim_end_matches('/'), package);

        let mut document: serde_json::Map<String, serde_json::Value> = self.get_json(&url).await?;
        let field = scope.list_field();
        let list = document
            .remove(field)
            .ok_or_else(|| UnitError::decode(&url, format!("missing `{}` list", field)))?;

        let raw: Vec<RawCatalogEntry> =
            serde_json::from_value(list).map_err(|e| UnitError::decode(&url, e))?;

        Ok(Catalog {
            entries: raw.into_iter().map(CatalogEntry::from).collect(),
        })
    }

    async fn fetch_unit_metadata(
        &self,
        registry_url: &str,
        name: &str,
    ) -> UnitResult<UnitMetadata> {
        let url = format!("{}/{}", registry_url.trim_end_matches('/'), name);
        let document: RawPackageDocument = self.get_json(&url).await?;
        Ok(document.into())
    }

    async fn fetch_tag_metadata(
        &self,
        registry_url: &str,
        name: &str,
        tag: &str,
    ) -> UnitResult<TagMetadata> {
        let url = format!("{}/{}/{}", registry_url.trim_end_matches('/'), name, tag);
        self.get_json(&url).await
    }
}
