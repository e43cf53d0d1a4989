// ── Runtime coordinator configuration ──
//
// Describes *where* the event server lives and how long to wait on it.
// The CLI (via eufylink-config) builds a `CoordinatorConfig` and hands it
// in; core never reads config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::EventRule;
use crate::error::CoreError;

/// Bound on a session flag wait: `max_polls` intervals of `poll_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagWait {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl FlagWait {
    /// Total time a wait may take before it reports failure.
    pub fn ceiling(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_polls)
    }

    /// [`ceiling()`](Self::ceiling) in whole milliseconds, for error reports.
    pub fn ceiling_ms(&self) -> u64 {
        u64::try_from(self.ceiling().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for FlagWait {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_polls: 5,
        }
    }
}

/// Configuration for a single event server connection.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Event server URL (e.g., `ws://127.0.0.1:3000`).
    pub url: Url,
    /// How often the background task refreshes (seconds). 0 = never.
    pub update_interval_secs: u64,
    /// Bound on the start-listening and poll-refresh acknowledgments.
    pub flag_wait: FlagWait,
    /// Extra event classification rules; same-named built-ins are replaced.
    pub events: Vec<EventRule>,
}

impl CoordinatorConfig {
    /// Build a config for `ws://{host}:{port}` with default tuning.
    pub fn for_server(host: &str, port: u16) -> Result<Self, CoreError> {
        let url = Url::parse(&format!("ws://{host}:{port}")).map_err(|e| CoreError::Config {
            message: format!("invalid event server address {host}:{port}: {e}"),
        })?;

        Ok(Self {
            url,
            ..Self::default()
        })
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("ws://127.0.0.1:3000").expect("static URL is valid"),
            update_interval_secs: 60,
            flag_wait: FlagWait::default(),
            events: Vec::new(),
        }
    }
}

/// Serialized form of [`FlagWait`] used by config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagWaitSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_max_polls() -> u32 {
    5
}

impl Default for FlagWaitSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
        }
    }
}

impl From<FlagWaitSettings> for FlagWait {
    fn from(settings: FlagWaitSettings) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_polls: settings.max_polls,
        }
    }
}
