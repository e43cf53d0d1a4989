//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use eufylink_config::ConfigError;
use eufylink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to event server at {url}")]
    #[diagnostic(
        code(eufylink::connection_failed),
        help(
            "Check that eufy-security-ws is running and reachable.\n\
             URL: {url}\n\
             Override with: eufylink --host <HOST> --port <PORT> snapshot"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Lost the event server connection: {reason}")]
    #[diagnostic(code(eufylink::disconnected))]
    Disconnected { reason: String },

    // ── Session ──────────────────────────────────────────────────────

    #[error("Event server did not acknowledge start_listening within {millis} ms")]
    #[diagnostic(
        code(eufylink::not_listening),
        help(
            "The socket opened but the server never sent its state.\n\
             Check the server log, or raise [flag_wait] max_polls in the config."
        )
    )]
    NotListening { millis: u64 },

    #[error("Poll refresh timed out after {millis} ms")]
    #[diagnostic(
        code(eufylink::timeout),
        help("The server may be busy talking to the eufy cloud. Try again shortly.")
    )]
    Timeout { millis: u64 },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(eufylink::not_found),
        help("Run: eufylink snapshot to see known stations and devices")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(eufylink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(eufylink::config),
        help("Inspect the resolved configuration with: eufylink config show")
    )]
    Config { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(eufylink::internal))]
    Internal { message: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected { .. } => exit_code::CONNECTION,
            Self::NotListening { .. } | Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::NotConnected | CoreError::TransportClosed => CliError::Disconnected {
                reason: err.to_string(),
            },

            CoreError::InitializationTimeout { timeout_ms } => CliError::NotListening {
                millis: timeout_ms,
            },

            CoreError::RefreshTimeout { timeout_ms } => CliError::Timeout {
                millis: timeout_ms,
            },

            CoreError::InvalidClassification { event, reason } => CliError::Validation {
                field: format!("events.{event}"),
                reason,
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_timeouts_map_to_timeout_exit_code() {
        let err = CliError::from(CoreError::RefreshTimeout { timeout_ms: 300 });
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
        assert!(err.to_string().contains("300 ms"));

        let err = CliError::from(CoreError::InitializationTimeout { timeout_ms: 300 });
        assert!(matches!(err, CliError::NotListening { millis: 300 }));
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn connection_errors_keep_the_url() {
        let err = CliError::from(CoreError::ConnectionFailed {
            url: "ws://127.0.0.1:3000/".into(),
            reason: "refused".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
        assert!(err.to_string().contains("ws://127.0.0.1:3000/"));
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "port".into(),
            reason: "must be between 1 and 65535".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
