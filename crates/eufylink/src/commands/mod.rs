//! Command dispatch: bridges CLI args -> coordinator -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod snapshot;
pub mod watch;

use eufylink_core::CoordinatorConfig;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub async fn dispatch(
    cmd: Command,
    config: CoordinatorConfig,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Snapshot => snapshot::handle(config, format, global).await,
        Command::Watch(args) => watch::handle(config, args, format, global).await,
        Command::Properties(args) => device::properties(config, args, global).await,
        Command::Rtsp(args) => device::rtsp(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
