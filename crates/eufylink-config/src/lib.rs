//! Configuration for eufylink tools.
//!
//! A single TOML file (plus `EUFYLINK_*` environment overrides) and its
//! translation to `eufylink_core::CoordinatorConfig`. Core never reads
//! configuration itself; the CLI layers its flags on top of [`Config`].

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use eufylink_core::{ClassificationTable, CoordinatorConfig, EventRule, FlagWaitSettings};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Event server host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Event server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between poll refreshes. 0 disables periodic refresh.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    /// Bound on the listen / refresh acknowledgment waits.
    #[serde(default)]
    pub flag_wait: FlagWaitSettings,

    /// Global defaults for CLI output.
    #[serde(default)]
    pub defaults: Defaults,

    /// Extra event classification rules. Same-named built-ins are replaced.
    #[serde(default)]
    pub events: Vec<EventRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            update_interval: default_update_interval(),
            flag_wait: FlagWaitSettings::default(),
            defaults: Defaults::default(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}
fn default_update_interval() -> u64 {
    60
}
fn default_output() -> String {
    "table".into()
}

impl Config {
    /// Validate and build the core coordinator config.
    pub fn to_coordinator_config(&self) -> Result<CoordinatorConfig, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(validation("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(validation("port", "must be between 1 and 65535"));
        }
        if self.flag_wait.poll_interval_ms == 0 {
            return Err(validation("flag_wait.poll_interval_ms", "must be positive"));
        }
        if self.flag_wait.max_polls == 0 {
            return Err(validation("flag_wait.max_polls", "must be positive"));
        }
        ClassificationTable::with_overrides(&self.events)
            .map_err(|e| validation("events", &e.to_string()))?;

        let base = CoordinatorConfig::for_server(&self.host, self.port)
            .map_err(|e| validation("host", &e.to_string()))?;

        Ok(CoordinatorConfig {
            update_interval_secs: self.update_interval,
            flag_wait: self.flag_wait.into(),
            events: self.events.clone(),
            ..base
        })
    }
}

fn validation(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "eufylink", "eufylink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("eufylink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from `path` + environment.
///
/// A missing file is not an error; defaults and environment still apply.
/// Nested keys use a double underscore: `EUFYLINK_FLAG_WAIT__MAX_POLLS`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("EUFYLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use eufylink_core::EventTarget;
    use pretty_assertions::assert_eq;

    use super::*;

    fn write(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.update_interval, 60);
        assert_eq!(cfg.flag_wait, FlagWaitSettings::default());
    }

    #[test]
    fn file_values_and_event_rules_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
host = "192.168.1.20"
port = 3001
update_interval = 15

[flag_wait]
poll_interval_ms = 250
max_polls = 8

[[events]]
event = "motion_detected"
property = "motionDetected"
value_field = "state"
target = "live"
"#,
        );

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.port, 3001);
        assert_eq!(cfg.events.len(), 1);
        assert_eq!(cfg.events[0].target, EventTarget::Live);

        let core = cfg.to_coordinator_config().unwrap();
        assert_eq!(core.url.as_str(), "ws://192.168.1.20:3001/");
        assert_eq!(core.update_interval_secs, 15);
        assert_eq!(core.flag_wait.ceiling(), Duration::from_secs(2));
        assert_eq!(core.events, cfg.events);
    }

    #[test]
    fn zero_port_is_rejected() {
        let cfg = Config {
            port: 0,
            ..Config::default()
        };
        let err = cfg.to_coordinator_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "port"));
    }

    #[test]
    fn duplicate_event_rules_are_rejected() {
        let rule = EventRule::new("rings", Some("ringing"), "state", EventTarget::Cached);
        let cfg = Config {
            events: vec![rule.clone(), rule],
            ..Config::default()
        };
        let err = cfg.to_coordinator_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "events"));
    }

    #[test]
    fn save_then_load_preserves_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            host: "eufy.local".into(),
            update_interval: 0,
            events: vec![EventRule::new(
                "package delivered",
                Some("packageDelivered"),
                "state",
                EventTarget::Cached,
            )],
            ..Config::default()
        };

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn malformed_toml_is_a_figment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "port = \"not a number\"");
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Figment(_))
        ));
    }
}
