//! Assertion helpers for manifest state

#![allow(dead_code)]

use std::path::Path;
use stencil_core::types::{UnitRecord, NONE_VERSION};
use stencil_units::outcome::Outcome;

/// Unwrap a successful outcome with a readable failure message
pub fn expect_ok<T: std::fmt::Debug>(outcome: Outcome<T>) -> T {
    match outcome {
        Outcome::Ok(data) => data,
        Outcome::Err(e) => panic!("operation failed: {}", e),
    }
}

pub fn find<'a>(records: &'a [UnitRecord], name: &str) -> &'a UnitRecord {
    records
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("unit {} missing from {:?}", name, records))
}

/// Assert a tag's `(installed, available, needs_update)` triple
pub fn assert_tag(
    record: &UnitRecord,
    tag: &str,
    installed: &str,
    available: &str,
    needs_update: bool,
) {
    let t = record
        .tag(tag)
        .unwrap_or_else(|| panic!("{} has no tag {}", record.name, tag));
    assert_eq!(t.installed_version, installed, "installed version of {}@{}", record.name, tag);
    assert_eq!(
        t.available_version.as_deref(),
        Some(available),
        "available version of {}@{}",
        record.name,
        tag
    );
    assert_eq!(t.needs_update, needs_update, "needs_update of {}@{}", record.name, tag);
}

pub fn assert_not_installed(record: &UnitRecord, tag: &str) {
    let t = record.tag(tag).expect("tag present");
    assert_eq!(t.installed_version, NONE_VERSION);
    assert!(t.local_path.is_none());
    assert!(!t.needs_update);
}

/// Assert the fixture installed at `dir` is `version`
pub fn assert_installed_content(dir: &Path, version: &str) {
    let content = std::fs::read_to_string(dir.join("VERSION"))
        .unwrap_or_else(|e| panic!("{} not installed: {}", dir.display(), e));
    assert_eq!(content, version);
}
