//! List command

use anyhow::Result;
use camino::Utf8Path;
use stencil_core::types::{UnitRecord, UnitType};
use tabled::{
    settings::{object::Columns, Modify, Style, Width},
    Table, Tabled,
};

use super::common::{finish, orchestrator};
use crate::cli::ListArgs;
use crate::output;

/// One row per unit tag
#[derive(Tabled, Debug, PartialEq, Eq)]
pub(super) struct TagRow {
    name: String,
    tag: String,
    installed: String,
    available: String,
    status: String,
    description: String,
}

/// Rows for `records`, optionally only installed tags
pub(super) fn rows(records: &[UnitRecord], installed_only: bool) -> Vec<TagRow> {
    let mut rows = Vec::new();
    for record in records {
        for tag in &record.tags {
            if installed_only && !tag.is_installed() {
                continue;
            }

            let status = if tag.needs_update {
                "update available"
            } else if tag.is_installed() && record.applied {
                "applied"
            } else if tag.is_installed() {
                "installed"
            } else {
                "-"
            };

            rows.push(TagRow {
                name: record.name.clone(),
                tag: tag.tag_name.clone(),
                installed: tag.installed().unwrap_or("-").to_string(),
                available: tag.available_version.clone().unwrap_or_else(|| "-".to_string()),
                status: status.to_string(),
                description: record.description.clone().unwrap_or_default(),
            });
        }
    }
    rows
}

pub(super) fn print_table(unit_type: UnitType, records: &[UnitRecord], installed_only: bool) {
    let rows = rows(records, installed_only);
    if rows.is_empty() {
        output::info(&format!("No {} units cached", unit_type));
        return;
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    table.with(Modify::new(Columns::new(5..6)).with(Width::wrap(50).keep_words(true)));
    println!("{}", table);
}

pub async fn run(args: ListArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let orchestrator = orchestrator(config_path)?;
    let records = finish(orchestrator.get(args.unit_type).await, args.json)?;

    if !args.json {
        print_table(args.unit_type, &records, args.installed);
    }
    Ok(())
}
