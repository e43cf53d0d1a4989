//! `eufylink watch`: run the mirror and print every published state.
//!
//! The coordinator's own refresh task drives poll refreshes. When the
//! connection drops to `NotListening` the session is re-initialized with
//! exponential backoff. The backoff only resets once a session has stayed
//! up for [`STABLE_SESSION`].

use std::time::Duration;

use eufylink_core::{ConnectionState, Coordinator, CoordinatorConfig, ReconnectConfig};
use tokio::time::Instant;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// Uptime after which a lost session reconnects without backoff.
const STABLE_SESSION: Duration = Duration::from_secs(30);

/// Why the inner print loop ended.
enum Exit {
    Done,
    ConnectionLost,
}

pub async fn handle(
    config: CoordinatorConfig,
    args: WatchArgs,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let coordinator = Coordinator::new(config)?;
    let reconnect = ReconnectConfig {
        max_retries: args.max_retries,
        ..ReconnectConfig::default()
    };

    let mut printed = 0usize;
    let mut attempt = 0u32;

    loop {
        let failure: CliError = match coordinator.initialize().await {
            Err(e) => e.into(),
            Ok(()) => {
                let started = Instant::now();
                match print_until_lost(&coordinator, args.count, &mut printed, format, global).await
                {
                    Exit::Done => break,
                    Exit::ConnectionLost if session_was_stable(started.elapsed()) => {
                        warn!("event server connection lost, reconnecting");
                        attempt = 0;
                        continue;
                    }
                    Exit::ConnectionLost => CliError::Disconnected {
                        reason: "connection closed shortly after listening started".into(),
                    },
                }
            }
        };

        if reconnect.exhausted(attempt) {
            coordinator.disconnect().await;
            return Err(failure);
        }
        let delay = reconnect.delay_for(attempt);
        warn!(error = %failure, attempt, delay_ms = delay_ms(delay), "session failed, retrying");
        attempt = attempt.saturating_add(1);

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    coordinator.disconnect().await;
    info!(printed, "watch finished");
    Ok(())
}

async fn print_until_lost(
    coordinator: &Coordinator,
    limit: Option<usize>,
    printed: &mut usize,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Exit {
    let mut states = coordinator.connection_state();
    // Yields the current state first, then one item per publish.
    let mut stream = coordinator.subscribe().into_stream();

    loop {
        tokio::select! {
            next = stream.next() => {
                let Some(state) = next else { return Exit::Done };
                output::print_output(&output::render_state(format, &state), global.quiet);
                *printed += 1;
                if limit.is_some_and(|max| *printed >= max) {
                    return Exit::Done;
                }
            }
            lost = states.wait_for(|s| *s == ConnectionState::NotListening) => {
                return if lost.is_ok() { Exit::ConnectionLost } else { Exit::Done };
            }
            _ = tokio::signal::ctrl_c() => return Exit::Done,
        }
    }
}

fn session_was_stable(uptime: Duration) -> bool {
    uptime >= STABLE_SESSION
}

fn delay_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sessions_keep_backing_off() {
        assert!(!session_was_stable(Duration::ZERO));
        assert!(!session_was_stable(Duration::from_secs(29)));
        assert!(session_was_stable(STABLE_SESSION));
        assert!(session_was_stable(Duration::from_secs(600)));
    }
}
