// ── Core error types ──
//
// Errors surfaced by the coordinator. Consumers never see raw socket or
// JSON failures; the `From<eufylink_api::Error>` impl translates them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to event server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Not connected to the event server")]
    NotConnected,

    #[error("Transport closed while sending")]
    TransportClosed,

    // ── Session errors ───────────────────────────────────────────────
    #[error("Start listening was not acknowledged within {timeout_ms} ms")]
    InitializationTimeout { timeout_ms: u64 },

    #[error("Poll refresh was not acknowledged within {timeout_ms} ms")]
    RefreshTimeout { timeout_ms: u64 },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Invalid classification rule for event '{event}': {reason}")]
    InvalidClassification { event: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for failures a scheduler should simply retry next tick.
    pub fn is_tick_failure(&self) -> bool {
        matches!(
            self,
            Self::RefreshTimeout { .. } | Self::NotConnected | Self::TransportClosed
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<eufylink_api::Error> for CoreError {
    fn from(err: eufylink_api::Error) -> Self {
        match err {
            eufylink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            eufylink_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            eufylink_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            eufylink_api::Error::ChannelClosed => CoreError::TransportClosed,
            eufylink_api::Error::Serialization(e) => {
                CoreError::Internal(format!("Serialization error: {e}"))
            }
        }
    }
}
