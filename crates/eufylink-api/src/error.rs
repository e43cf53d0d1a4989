use thiserror::Error;

/// Top-level error type for the `eufylink-api` crate.
///
/// Covers the transport and serialization failure modes of the event
/// server link. `eufylink-core` maps these into coordinator errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// The link's background task is gone, nothing can be sent.
    #[error("Transport channel closed")]
    ChannelClosed,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON serialization of an outbound command failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } | Self::ChannelClosed
        )
    }
}
