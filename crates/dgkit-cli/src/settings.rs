use anyhow::{Context, Result};
use dgkit::Config;
use dgkit::config::loader::load_settings;

use crate::cli::Cli;

/// Builds the client configuration.
///
/// Precedence: `--url`/`--port` flags, then `DGKIT__*` env, then the settings file.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(url) = &cli.url {
        settings.url = url.clone();
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    settings.into_config().context("Invalid settings")
}
