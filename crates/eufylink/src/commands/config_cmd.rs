//! Config subcommand handlers.

use eufylink_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_path(global);

    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::with_overrides(config::load(global)?, global);
            let format = config::output_format(global, &cfg)?;
            let rendered = output::render_single(format, &cfg, |cfg| {
                toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# unrenderable: {e}"))
            });
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!(
                        "{} already exists; pass --force to overwrite",
                        path.display()
                    ),
                });
            }

            let cfg = config::with_overrides(Config::default(), global);
            // Validate before writing so a bad --host never lands on disk.
            cfg.to_coordinator_config()?;
            eufylink_config::save_config_to(&cfg, &path)?;

            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}
