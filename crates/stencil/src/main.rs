//! Stencil CLI - project templates and plugins
//!
//! This is the main entry point for the Stencil command-line interface.

mod cli;
mod commands;
mod output;
mod version;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Version(args) => commands::version::run(args),
        Commands::Config(cmd) => commands::config::run(cmd, config),
        Commands::List(args) => commands::list::run(args, config).await,
        Commands::Refresh(args) => commands::refresh::run(args, config).await,
        Commands::Install(args) => commands::lifecycle::install(args, config).await,
        Commands::Update(args) => commands::lifecycle::update(args, config).await,
        Commands::Reinstall(args) => commands::lifecycle::reinstall(args, config).await,
        Commands::Uninstall(args) => commands::lifecycle::uninstall(args, config).await,
        Commands::Apply(args) => commands::plugin::set_applied(args, true, config).await,
        Commands::Unapply(args) => commands::plugin::set_applied(args, false, config).await,
        Commands::Watch(args) => commands::watch::run(args, config).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
