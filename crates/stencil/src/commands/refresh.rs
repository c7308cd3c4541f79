//! Refresh command

use anyhow::Result;
use camino::Utf8Path;
use std::collections::BTreeMap;
use stencil_core::types::UnitType;

use super::common::orchestrator;
use super::list::print_table;
use crate::cli::RefreshArgs;
use crate::output;

pub async fn run(args: RefreshArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let orchestrator = orchestrator(config_path)?;
    let unit_types: Vec<UnitType> = match args.unit_type {
        Some(unit_type) => vec![unit_type],
        None => UnitType::ALL.to_vec(),
    };
    let ttl = orchestrator.settings().refresh_ttl;

    let mut outcomes = BTreeMap::new();
    for unit_type in unit_types {
        let spinner = output::spinner(&format!("Refreshing {} units", unit_type), args.json);
        let outcome = if args.if_stale {
            orchestrator.refresh_if_stale(unit_type, ttl).await
        } else {
            orchestrator.refresh(unit_type).await
        };
        spinner.finish_and_clear();
        outcomes.insert(unit_type.key(), (unit_type, outcome));
    }

    if args.json {
        let by_key: BTreeMap<_, _> = outcomes.iter().map(|(k, (_, o))| (*k, o)).collect();
        return output::json(&by_key);
    }

    let mut failed = 0;
    for (unit_type, outcome) in outcomes.values() {
        match outcome.data() {
            Some(records) => {
                output::header(&format!("{} units", unit_type));
                print_table(*unit_type, records, false);
            }
            None => {
                failed += 1;
                if let Some(e) = outcome.error() {
                    output::error(&format!("Refreshing {} units failed: {}", unit_type, e));
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} refresh(es) failed", failed);
    }
    Ok(())
}
