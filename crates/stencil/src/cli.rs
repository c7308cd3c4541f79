//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use stencil_core::types::UnitType;

/// Stencil - project templates and plugins from a package registry
#[derive(Parser, Debug)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a config.yaml replacing ~/.stencil/config.yaml
    #[arg(short, long, global = true, env = "STENCIL_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// List cached units without contacting the registry
    List(ListArgs),

    /// Reconcile the cache with the registry
    Refresh(RefreshArgs),

    /// Install a unit tag
    Install(UnitArgs),

    /// Update an installed unit tag
    Update(UnitArgs),

    /// Remove and install a unit tag again
    Reinstall(UnitArgs),

    /// Remove an installed unit tag
    Uninstall(UnitArgs),

    /// Activate an installed plugin
    Apply(PluginArgs),

    /// Deactivate a plugin
    Unapply(PluginArgs),

    /// Keep refreshing catalogs in the foreground and print events
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved runtime configuration
    Show(ConfigShowArgs),

    /// Print the config file and install locations
    Path,
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Unit type: official, organization or plugin
    #[arg(short = 't', long = "type", default_value = "official")]
    pub unit_type: UnitType,

    /// Show installed units only
    #[arg(long)]
    pub installed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Unit type to refresh (all types when omitted)
    #[arg(short = 't', long = "type")]
    pub unit_type: Option<UnitType>,

    /// Skip catalogs refreshed within the configured TTL
    #[arg(long)]
    pub if_stale: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UnitArgs {
    /// Unit name, e.g. `widget` or `@acme/widget`
    pub name: String,

    /// Unit type: official, organization or plugin
    #[arg(short = 't', long = "type", default_value = "official")]
    pub unit_type: UnitType,

    /// Release tag (plugins always use `latest`; templates default to
    /// their first cached tag)
    #[arg(long)]
    pub tag: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PluginArgs {
    /// Plugin name
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Unit types to keep fresh (all when omitted)
    #[arg(short = 't', long = "type")]
    pub unit_types: Vec<UnitType>,

    /// Seconds between staleness checks
    #[arg(long, default_value_t = 60)]
    pub interval: u64,
}
