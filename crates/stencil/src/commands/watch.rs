//! Watch command: periodic refresh in the foreground

use anyhow::Result;
use camino::Utf8Path;
use std::time::Duration;
use stencil_core::types::UnitType;
use stencil_units::{RefreshScheduler, UnitEvent};
use tokio::sync::broadcast::error::RecvError;

use super::common::orchestrator;
use crate::cli::WatchArgs;
use crate::output;

pub async fn run(args: WatchArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let orchestrator = orchestrator(config_path)?;
    let unit_types = if args.unit_types.is_empty() {
        UnitType::ALL.to_vec()
    } else {
        args.unit_types
    };

    let mut events = orchestrator.subscribe();
    let scheduler = RefreshScheduler::spawn(
        orchestrator,
        unit_types,
        Duration::from_secs(args.interval.max(1)),
    );
    output::info("Watching for catalog changes, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = events.recv() => match received {
                Ok(envelope) => print_event(&envelope.event),
                Err(RecvError::Lagged(skipped)) => {
                    output::warning(&format!("Missed {} events", skipped));
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    scheduler.stop();
    Ok(())
}

fn print_event(event: &UnitEvent) {
    match event {
        UnitEvent::RefreshCompleted { unit_type, units } => {
            output::info(&format!("Refreshed {} {} units", units, unit_type));
        }
        UnitEvent::CatalogUnavailable {
            unit_type, message, ..
        } => {
            output::warning(&format!("{} catalog unavailable: {}", unit_type, message));
        }
        UnitEvent::OperationFailed {
            operation, message, ..
        } => {
            output::error(&format!("{} failed: {}", operation, message));
        }
        other => tracing::debug!("{:?}", other),
    }
}
