//! CLI handlers for config subcommands.

mod show;

use crate::common::config::{config_path, AppConfig};
use anyhow::{Context, Result};

fn defaults_toml() -> Result<String> {
    toml::to_string_pretty(&AppConfig::default()).context("Failed to serialize default config")
}

/// Print resolved config file path.
pub fn run_config_path() -> Result<()> {
    let stdout = std::io::stdout();
    let mut output = stdout.lock();
    show::path_config_with_writer(&config_path(), &mut output)
}

/// Print config file contents, or the defaults when no file exists.
pub fn run_config_show() -> Result<()> {
    let path = config_path();
    let defaults = defaults_toml()?;
    let stdout = std::io::stdout();
    let mut output = stdout.lock();
    let stderr = std::io::stderr();
    let mut err_output = stderr.lock();
    show::show_config_with_io(&path, &defaults, &mut output, &mut err_output)
}
