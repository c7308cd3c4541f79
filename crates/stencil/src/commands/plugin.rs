//! Plugin activation commands

use anyhow::Result;
use camino::Utf8Path;

use super::common::{finish, orchestrator};
use crate::cli::PluginArgs;
use crate::output;

pub async fn set_applied(
    args: PluginArgs,
    applied: bool,
    config_path: Option<&Utf8Path>,
) -> Result<()> {
    let orchestrator = orchestrator(config_path)?;
    let record = finish(orchestrator.set_applied(&args.name, applied).await, args.json)?;

    if !args.json {
        if record.applied {
            output::success(&format!("Applied {}", record.name));
        } else {
            output::success(&format!("Unapplied {}", record.name));
        }
    }
    Ok(())
}
