//! WebSocket link to the event server.
//!
//! A [`TransportLink`] is the coordinator's view of the socket: an
//! outbound text sender plus an ordered stream of [`TransportEvent`]s
//! (opened, message, closed, error). [`WebSocketLink::connect`] backs a
//! link with a real socket and a background pump task;
//! [`TransportLink::channel`] backs one with plain channels so the other
//! end can be scripted.
//!
//! # Example
//!
//! ```rust,ignore
//! use eufylink_api::{OutboundCommand, TransportEvent, WebSocketLink};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let url = Url::parse("ws://127.0.0.1:3000")?;
//! let mut link = WebSocketLink::connect(&url, CancellationToken::new()).await?;
//! link.sender.send(&OutboundCommand::StartListening).await?;
//!
//! while let Some(event) = link.events.recv().await {
//!     if let TransportEvent::Message(text) = event {
//!         println!("{text}");
//!     }
//! }
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::protocol::OutboundCommand;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Channel capacities ───────────────────────────────────────────────

const OUTBOUND_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ── TransportEvent ───────────────────────────────────────────────────

/// Lifecycle notifications delivered by a link, in socket order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is up.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The server closed the connection or the stream ended.
    Closed { code: Option<u16>, reason: String },
    /// The connection failed mid-stream.
    Error(String),
}

// ── LinkSender ───────────────────────────────────────────────────────

/// Cloneable outbound half of a link.
#[derive(Debug, Clone)]
pub struct LinkSender {
    tx: mpsc::Sender<String>,
}

impl LinkSender {
    /// Queue a raw text frame.
    pub async fn send_text(&self, text: String) -> Result<(), Error> {
        self.tx.send(text).await.map_err(|_| Error::ChannelClosed)
    }

    /// Serialize and queue a command.
    pub async fn send(&self, command: &OutboundCommand) -> Result<(), Error> {
        self.send_text(command.to_text()?).await
    }

    /// `true` once the receiving side of the link is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ── TransportLink ────────────────────────────────────────────────────

/// An open link: outbound sender, inbound event stream, and the
/// cancellation token that tears the link down.
pub struct TransportLink {
    pub sender: LinkSender,
    pub events: mpsc::Receiver<TransportEvent>,
    pub cancel: CancellationToken,
    /// Background pump task, when the link is backed by a socket.
    pub task: Option<JoinHandle<()>>,
}

/// The far end of an in-memory link created by [`TransportLink::channel`].
pub struct TransportPeer {
    pub events: mpsc::Sender<TransportEvent>,
    pub outbound: mpsc::Receiver<String>,
}

impl TransportLink {
    /// Create a link backed by channels instead of a socket.
    ///
    /// The returned [`TransportPeer`] plays the server: it receives every
    /// frame sent on the link and injects lifecycle events.
    pub fn channel() -> (Self, TransportPeer) {
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let link = Self {
            sender: LinkSender { tx: out_tx },
            events: event_rx,
            cancel: CancellationToken::new(),
            task: None,
        };
        let peer = TransportPeer {
            events: event_tx,
            outbound: out_rx,
        };
        (link, peer)
    }
}

impl TransportPeer {
    /// Deliver a text frame to the link.
    pub async fn deliver(&self, text: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Message(text.into())).await;
    }

    /// Deliver a lifecycle event to the link.
    pub async fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event).await;
    }

    /// Wait for the next frame sent on the link, parsed as JSON.
    pub async fn next_command(&mut self) -> Option<serde_json::Value> {
        let text = self.outbound.recv().await?;
        serde_json::from_str(&text).ok()
    }
}

// ── WebSocketLink ────────────────────────────────────────────────────

/// Socket-backed [`TransportLink`] factory.
pub struct WebSocketLink;

impl WebSocketLink {
    /// Open the socket and spawn the pump task.
    ///
    /// Returns once the handshake completes; the first event on the link
    /// is always [`TransportEvent::Opened`]. Cancelling `cancel` flushes
    /// queued outbound frames, sends a close frame and ends the task.
    pub async fn connect(url: &Url, cancel: CancellationToken) -> Result<TransportLink, Error> {
        tracing::info!(url = %url, "Connecting to WebSocket");

        let uri: tungstenite::http::Uri = url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

        let (ws_stream, _response) =
            tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri))
                .await
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("WebSocket connected");

        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        // Buffered before the pump starts, so it is always first.
        let _ = event_tx.send(TransportEvent::Opened).await;

        let task = tokio::spawn(pump(ws_stream, out_rx, event_tx, cancel.clone()));

        Ok(TransportLink {
            sender: LinkSender { tx: out_tx },
            events: event_rx,
            cancel,
            task: Some(task),
        })
    }
}

// ── Pump task ────────────────────────────────────────────────────────

/// Shuttle frames between the socket and the link channels until the
/// socket drops, the link is cancelled, or every sender is gone.
async fn pump(
    ws_stream: WsStream,
    mut outbound: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                while let Ok(text) = outbound.try_recv() {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            next = outbound.recv() => {
                let Some(text) = next else {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    tracing::warn!(error = %e, "WebSocket send failed");
                    let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                    break;
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let _ = event_tx.send(TransportEvent::Message(text.as_str().to_owned())).await;
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or((None, String::new()), |cf| {
                            (Some(u16::from(cf.code)), cf.reason.as_str().to_owned())
                        });
                        tracing::info!(?code, reason = %reason, "WebSocket close frame received");
                        let _ = event_tx.send(TransportEvent::Closed { code, reason }).await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket error");
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                    None => {
                        tracing::info!("WebSocket stream ended");
                        let _ = event_tx
                            .send(TransportEvent::Closed { code: None, reason: "stream ended".into() })
                            .await;
                        break;
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }

    tracing::debug!("WebSocket pump exiting");
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for re-establishing a session.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

impl ReconnectConfig {
    /// Exponential backoff with jitter.
    ///
    /// `delay = min(initial * 2^attempt, max) + jitter`
    ///
    /// Jitter is +-25% to spread out reconnection storms from multiple clients.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        // Deterministic "jitter" seeded from the attempt number.
        let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
        let with_jitter = (capped * jitter_factor).max(0.0);

        Duration::from_secs_f64(with_jitter)
    }

    /// `true` once `attempt` has used up the retry budget.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_retries.is_some_and(|max| attempt >= max)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
        assert!(!config.exhausted(1_000));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = config.delay_for(0);
        let d1 = config.delay_for(1);
        let d2 = config.delay_for(2);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: Some(3),
        };

        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(config.delay_for(10) <= Duration::from_secs(13));
        assert!(config.delay_for(u32::MAX) <= Duration::from_secs(13));
        assert!(!config.exhausted(2));
        assert!(config.exhausted(3));
    }

    #[tokio::test]
    async fn channel_link_round_trip() {
        let (mut link, mut peer) = TransportLink::channel();

        link.sender.send(&OutboundCommand::PollRefresh).await.unwrap();
        let sent = peer.next_command().await.unwrap();
        assert_eq!(sent["messageId"], "poll_refresh");

        peer.deliver(r#"{"type":"event"}"#).await;
        assert_eq!(
            link.events.recv().await,
            Some(TransportEvent::Message(r#"{"type":"event"}"#.into()))
        );
    }

    #[tokio::test]
    async fn send_after_peer_drop_reports_closed() {
        let (link, peer) = TransportLink::channel();
        drop(peer);

        assert!(link.sender.is_closed());
        let err = link.sender.send(&OutboundCommand::StartListening).await.unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
        assert!(err.is_transient());
    }
}
