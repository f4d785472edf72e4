pub mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use na_domain::config::Config;

/// Env var naming the config file; falls back to `./novel-admin.toml`.
pub const CONFIG_PATH_ENV: &str = "NOVEL_ADMIN_CONFIG";

/// novel-admin — control plane for the interactive-novel platform.
#[derive(Debug, Parser)]
#[command(name = "novel-admin", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the admin server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Validate the configuration file and report issues.
    Validate,
    /// Print the effective configuration (defaults applied).
    Show,
}

/// Load the config file. A missing file is not an error: every setting
/// has a default, and secrets come from the environment anyway.
pub fn load_config() -> anyhow::Result<(Config, PathBuf)> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("novel-admin.toml"));

    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file; using defaults");
        return Ok((Config::default(), path));
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: Config =
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok((config, path))
}
