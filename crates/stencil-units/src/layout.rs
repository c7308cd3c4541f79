//! On-disk layout of installed units
//!
//! ```text
//! {templates_root}/widget-stable/     installed official template tag
//! {templates_root}/.org/widget-stable/ installed organisation template tag
//! {plugins_root}/lint-latest/         installed plugin
//! {root}/.staging/widget-stable/      update being prepared
//! {root}/.backup/widget-stable/       live copy during an update swap
//! ```
//!
//! Every unit type owns its root, so a directory belongs to exactly one
//! manifest. Unit names never start with `.`, which keeps `.org` clear of
//! tag directories.

use crate::error::{UnitError, UnitResult};
use std::path::{Path, PathBuf};
use stencil_core::types::{ResolvedPaths, TemplateOrigin, UnitType};

const STAGING_DIR: &str = ".staging";
const BACKUP_DIR: &str = ".backup";
const ORG_DIR: &str = ".org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLayout {
    templates_root: PathBuf,
    org_templates_root: PathBuf,
    plugins_root: PathBuf,
}

impl UnitLayout {
    pub fn new(templates_root: impl Into<PathBuf>, plugins_root: impl Into<PathBuf>) -> Self {
        let templates_root = templates_root.into();
        Self {
            org_templates_root: templates_root.join(ORG_DIR),
            templates_root,
            plugins_root: plugins_root.into(),
        }
    }

    pub fn from_paths(paths: &ResolvedPaths) -> Self {
        Self::new(&paths.templates_dir, &paths.plugins_dir)
    }

    pub fn root(&self, unit_type: UnitType) -> &Path {
        match unit_type {
            UnitType::Template(TemplateOrigin::Official) => &self.templates_root,
            UnitType::Template(TemplateOrigin::Organization) => &self.org_templates_root,
            UnitType::Plugin => &self.plugins_root,
        }
    }

    /// Directory name of a tag, e.g. `widget-stable` or `@acme+widget-stable`
    pub fn dir_name(name: &str, tag: &str) -> UnitResult<String> {
        let valid_segment = |s: &str| {
            !s.is_empty()
                && s != "."
                && s != ".."
                && !s.contains(['\\', '\0'])
                && !s.starts_with('.')
        };

        // Scoped names keep their scope, flattened into one segment
        let segments: Vec<&str> = name.split('/').collect();
        let name_ok = match segments.as_slice() {
            [plain] => valid_segment(plain),
            [scope, plain] => scope.starts_with('@') && scope.len() > 1 && valid_segment(plain),
            _ => false,
        };
        if !name_ok {
            return Err(UnitError::not_found(format!("invalid unit name `{}`", name)));
        }
        if !valid_segment(tag) || tag.contains('/') {
            return Err(UnitError::not_found(format!("invalid tag `{}`", tag)));
        }

        Ok(format!("{}-{}", segments.join("+"), tag))
    }

    /// Live location of an installed tag
    pub fn tag_path(&self, unit_type: UnitType, name: &str, tag: &str) -> UnitResult<PathBuf> {
        Ok(self.root(unit_type).join(Self::dir_name(name, tag)?))
    }

    /// Where an update is extracted before the swap
    pub fn staging_path(&self, unit_type: UnitType, name: &str, tag: &str) -> UnitResult<PathBuf> {
        Ok(self
            .root(unit_type)
            .join(STAGING_DIR)
            .join(Self::dir_name(name, tag)?))
    }

    /// Where the live copy waits while an update is swapped in
    pub fn backup_path(&self, unit_type: UnitType, name: &str, tag: &str) -> UnitResult<PathBuf> {
        Ok(self
            .root(unit_type)
            .join(BACKUP_DIR)
            .join(Self::dir_name(name, tag)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> UnitLayout {
        UnitLayout::new("/data/templates", "/data/plugins")
    }

    #[test]
    fn test_tag_paths() {
        let layout = layout();
        let official = UnitType::Template(TemplateOrigin::Official);
        let org = UnitType::Template(TemplateOrigin::Organization);

        assert_eq!(
            layout.tag_path(official, "widget", "stable").unwrap(),
            PathBuf::from("/data/templates/widget-stable")
        );
        assert_eq!(
            layout.tag_path(org, "widget", "stable").unwrap(),
            PathBuf::from("/data/templates/.org/widget-stable")
        );
        assert_eq!(
            layout.staging_path(org, "widget", "stable").unwrap(),
            PathBuf::from("/data/templates/.org/.staging/widget-stable")
        );
        assert_eq!(
            layout.tag_path(UnitType::Plugin, "lint", "latest").unwrap(),
            PathBuf::from("/data/plugins/lint-latest")
        );
        assert_eq!(
            layout.staging_path(official, "widget", "beta").unwrap(),
            PathBuf::from("/data/templates/.staging/widget-beta")
        );
        assert_eq!(
            layout.backup_path(UnitType::Plugin, "lint", "latest").unwrap(),
            PathBuf::from("/data/plugins/.backup/lint-latest")
        );
    }

    #[test]
    fn test_unit_types_never_share_a_directory() {
        let layout = layout();
        let paths: std::collections::HashSet<PathBuf> = UnitType::ALL
            .iter()
            .map(|unit_type| layout.tag_path(*unit_type, "widget", "latest").unwrap())
            .collect();
        assert_eq!(paths.len(), UnitType::ALL.len());
    }

    #[test]
    fn test_scoped_names_flattened() {
        assert_eq!(
            UnitLayout::dir_name("@acme/widget", "stable").unwrap(),
            "@acme+widget-stable"
        );
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(UnitLayout::dir_name("../etc", "stable").is_err());
        assert!(UnitLayout::dir_name("widget", "../../x").is_err());
        assert!(UnitLayout::dir_name("a/b/c", "stable").is_err());
        assert!(UnitLayout::dir_name("acme/widget", "stable").is_err());
        assert!(UnitLayout::dir_name("", "stable").is_err());
        assert!(UnitLayout::dir_name(".staging", "x").is_err());
    }
}
