//! `eufylink snapshot`: one listen + one refresh, then print.

use eufylink_core::{Coordinator, CoordinatorConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    config: CoordinatorConfig,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state = Coordinator::oneshot(config, |coordinator| async move {
        coordinator.refresh().await
    })
    .await?;

    output::print_output(&output::render_state(format, &state), global.quiet);
    Ok(())
}
