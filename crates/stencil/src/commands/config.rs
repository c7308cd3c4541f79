//! Config command

use anyhow::Result;
use camino::Utf8Path;

use super::common::load_settings;
use crate::cli::{ConfigCommands, ConfigShowArgs};
use crate::output;

pub fn run(cmd: ConfigCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args, config_path),
        ConfigCommands::Path => path(config_path),
    }
}

fn show(args: ConfigShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let settings = load_settings(config_path)?;

    if args.json {
        return output::json(&settings.config);
    }
    print!("{}", serde_yaml_ng::to_string(&settings.config)?);
    Ok(())
}

fn path(config_path: Option<&Utf8Path>) -> Result<()> {
    let settings = load_settings(config_path)?;
    let config_file = settings.loader.config_file();

    output::header("Stencil paths");
    output::kv(
        "config file",
        &format!(
            "{}{}",
            config_file,
            if config_file.exists() { "" } else { " (not present)" }
        ),
    );
    output::kv("templates", &settings.paths.templates_dir.display().to_string());
    output::kv("plugins", &settings.paths.plugins_dir.display().to_string());
    output::kv("store", &settings.paths.store_dir.display().to_string());
    Ok(())
}
