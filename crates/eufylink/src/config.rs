//! GlobalOpts-aware wrappers over `eufylink_config`.
//!
//! Flags beat environment, environment beats the config file.

use std::path::PathBuf;

use clap::ValueEnum;

use eufylink_config::Config;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// The config file in effect: `--config` / `EUFYLINK_CONFIG`, else the
/// platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(eufylink_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(eufylink_config::load_config_from(&config_path(global))?)
}

/// Apply `--host`, `--port` and `--interval` on top of the file config.
pub fn with_overrides(mut cfg: Config, global: &GlobalOpts) -> Config {
    if let Some(ref host) = global.host {
        cfg.host.clone_from(host);
    }
    if let Some(port) = global.port {
        cfg.port = port;
    }
    if let Some(interval) = global.interval {
        cfg.update_interval = interval;
    }
    cfg
}

/// `--output`, else the config's `[defaults] output`, else table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    OutputFormat::from_str(&cfg.defaults.output, true).map_err(|reason| CliError::Validation {
        field: "defaults.output".into(),
        reason,
    })
}
