//! Install, update, reinstall and uninstall commands

use anyhow::Result;
use camino::Utf8Path;
use stencil_core::types::{TagRecord, UnitRecord, UnitType};
use stencil_units::{LifecycleOrchestrator, Outcome};

use super::common::{finish, orchestrator, resolve_tag};
use crate::cli::UnitArgs;
use crate::output;

#[derive(Debug, Clone, Copy)]
enum Action {
    Install,
    Update,
    Reinstall,
    Uninstall,
}

impl Action {
    fn progress(self) -> &'static str {
        match self {
            Action::Install => "Installing",
            Action::Update => "Updating",
            Action::Reinstall => "Reinstalling",
            Action::Uninstall => "Uninstalling",
        }
    }

    async fn apply(
        self,
        orchestrator: &LifecycleOrchestrator,
        unit_type: UnitType,
        name: &str,
        tag: &str,
    ) -> Outcome<UnitRecord> {
        match self {
            Action::Install => orchestrator.install(unit_type, name, tag).await,
            Action::Update => orchestrator.update(unit_type, name, tag).await,
            Action::Reinstall => orchestrator.reinstall(unit_type, name, tag).await,
            Action::Uninstall => orchestrator.uninstall(unit_type, name, tag).await,
        }
    }
}

pub async fn install(args: UnitArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    run(Action::Install, args, config_path).await
}

pub async fn update(args: UnitArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    run(Action::Update, args, config_path).await
}

pub async fn reinstall(args: UnitArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    run(Action::Reinstall, args, config_path).await
}

pub async fn uninstall(args: UnitArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    run(Action::Uninstall, args, config_path).await
}

async fn run(action: Action, args: UnitArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let orchestrator = orchestrator(config_path)?;
    let tag = resolve_tag(&orchestrator, args.unit_type, &args.name, args.tag)?;

    let spinner = output::spinner(
        &format!("{} {}@{}", action.progress(), args.name, tag),
        args.json,
    );
    let outcome = action
        .apply(&orchestrator, args.unit_type, &args.name, &tag)
        .await;
    spinner.finish_and_clear();

    let record = finish(outcome, args.json)?;
    if !args.json {
        output::success(&summary(action, &record, &tag));
    }
    Ok(())
}

fn summary(action: Action, record: &UnitRecord, tag: &str) -> String {
    let version = record.tag(tag).and_then(TagRecord::installed);
    match (action, version) {
        (Action::Uninstall, _) => format!("Removed {}@{}", record.name, tag),
        (Action::Update, Some(v)) => format!("Updated {}@{} to {}", record.name, tag, v),
        (Action::Reinstall, Some(v)) => format!("Reinstalled {}@{} ({})", record.name, tag, v),
        (_, Some(v)) => format!("Installed {}@{} ({})", record.name, tag, v),
        (_, None) => format!("{}@{} is not installed", record.name, tag),
    }
}
