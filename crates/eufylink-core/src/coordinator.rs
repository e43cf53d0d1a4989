// ── Coordinator ──
//
// Owns one event server session: attaches a transport link, drives the
// listen / poll-refresh handshake, dispatches inbound frames into the
// state store and publishes merged snapshots to subscribers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use eufylink_api::{
    CommandTarget, DeviceType, EventFrame, Inbound, LinkSender, OutboundCommand, POLL_REFRESH_ID,
    ResultFrame, START_LISTENING_ID, TransportEvent, TransportLink, WebSocketLink,
};

use crate::classify::{ClassificationTable, EventTarget};
use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::session::{SessionFlag, SessionFlags};
use crate::store::{MergedState, StateStore};
use crate::stream::StateStream;

// ── ConnectionState ──────────────────────────────────────────────

/// Session state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// No session has been started yet.
    Uninitialized,
    /// The server acknowledged `start_listening`.
    Listening,
    /// The link closed or failed; re-initialize to resume.
    NotListening,
}

// ── Coordinator ──────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    classification: ClassificationTable,
    store: Mutex<StateStore>,
    flags: SessionFlags,
    published: watch::Sender<Arc<MergedState>>,
    connection_state: watch::Sender<ConnectionState>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
    last_event: watch::Sender<Option<DateTime<Utc>>>,
    sender: Mutex<Option<LinkSender>>,
    session: Mutex<Option<Session>>,
}

/// Background work tied to one attached link.
struct Session {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Coordinator {
    /// Create a coordinator. Does NOT connect; call
    /// [`initialize()`](Self::initialize).
    ///
    /// Fails when the configured event rules do not validate.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let classification = ClassificationTable::with_overrides(&config.events)?;

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                classification,
                store: Mutex::new(StateStore::new()),
                flags: SessionFlags::new(),
                published: watch::Sender::new(Arc::new(MergedState::default())),
                connection_state: watch::Sender::new(ConnectionState::Uninitialized),
                last_refresh: watch::Sender::new(None),
                last_event: watch::Sender::new(None),
                sender: Mutex::new(None),
                session: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Connect to the event server and start listening.
    ///
    /// Replaces any previous session.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        let url = &self.inner.config.url;
        let link = WebSocketLink::connect(url, CancellationToken::new())
            .await
            .map_err(|e| CoreError::ConnectionFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        self.start(link).await
    }

    /// Attach an open link and start listening on it.
    ///
    /// Spawns the inbound dispatcher, sends `start_listening` and waits
    /// for the server's acknowledgment. On success the state becomes
    /// [`Listening`](ConnectionState::Listening) and the periodic refresh
    /// task starts when an update interval is configured.
    pub async fn start(&self, link: TransportLink) -> Result<(), CoreError> {
        self.teardown().await;

        let TransportLink {
            sender,
            events,
            cancel,
            task,
        } = link;

        *self.inner.sender.lock().await = Some(sender);

        let mut handles = Vec::with_capacity(3);
        handles.push(tokio::spawn(dispatch_task(
            self.clone(),
            events,
            cancel.clone(),
        )));
        handles.extend(task);

        *self.inner.session.lock().await = Some(Session {
            cancel: cancel.clone(),
            handles,
        });

        let flags = &self.inner.flags;
        let wait = self.inner.config.flag_wait;

        flags.set(SessionFlag::ListeningActive, false);
        self.start_listening().await?;

        if !flags.wait_for(SessionFlag::ListeningActive, true, wait).await {
            warn!("start_listening was not acknowledged");
            self.inner
                .connection_state
                .send_replace(ConnectionState::NotListening);
            return Err(CoreError::InitializationTimeout {
                timeout_ms: wait.ceiling_ms(),
            });
        }

        // A close handled since the acknowledgment has already cleared the flag.
        let listening = self.inner.connection_state.send_if_modified(|state| {
            if flags.get(SessionFlag::ListeningActive) {
                *state = ConnectionState::Listening;
                true
            } else {
                false
            }
        });
        if !listening {
            return Err(CoreError::TransportClosed);
        }

        let interval_secs = self.inner.config.update_interval_secs;
        if interval_secs > 0 {
            let handle = tokio::spawn(refresh_task(self.clone(), interval_secs, cancel));
            if let Some(session) = self.inner.session.lock().await.as_mut() {
                session.handles.push(handle);
            }
        }

        info!(url = %self.inner.config.url, "listening for events");
        Ok(())
    }

    /// Request a poll refresh and wait for the acknowledgment.
    ///
    /// On success publishes and returns the merged state. On timeout the
    /// last published snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<MergedState>, CoreError> {
        let flags = &self.inner.flags;
        let wait = self.inner.config.flag_wait;

        flags.set(SessionFlag::PollRefreshed, false);
        self.poll_refresh().await?;

        if !flags.wait_for(SessionFlag::PollRefreshed, true, wait).await {
            return Err(CoreError::RefreshTimeout {
                timeout_ms: wait.ceiling_ms(),
            });
        }

        let snapshot = {
            let store = self.inner.store.lock().await;
            self.publish(&store)
        };
        self.inner.last_refresh.send_replace(Some(Utc::now()));
        debug!(
            cached = snapshot.cache.len(),
            "poll refresh complete"
        );
        Ok(snapshot)
    }

    /// Disconnect: cancel the link and background tasks.
    ///
    /// Outbound frames already queued are flushed before the socket
    /// closes.
    pub async fn disconnect(&self) {
        self.teardown().await;
        self.inner.flags.set(SessionFlag::ListeningActive, false);
        self.inner.connection_state.send_if_modified(|state| {
            if *state == ConnectionState::Listening {
                *state = ConnectionState::NotListening;
                true
            } else {
                false
            }
        });
        debug!("disconnected");
    }

    /// Drop the current link's sender, cancel it and join its tasks.
    async fn teardown(&self) {
        *self.inner.sender.lock().await = None;
        let session = self.inner.session.lock().await.take();

        if let Some(session) = session {
            session.cancel.cancel();
            for handle in session.handles {
                let _ = handle.await;
            }
        }
    }

    /// One-shot: initialize, run closure, disconnect.
    ///
    /// Disables the periodic refresh task; the closure drives refreshes.
    pub async fn oneshot<F, Fut, T>(config: CoordinatorConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.update_interval_secs = 0;

        let coordinator = Coordinator::new(cfg)?;
        if let Err(e) = coordinator.initialize().await {
            coordinator.disconnect().await;
            return Err(e);
        }
        let result = f(coordinator.clone()).await;
        coordinator.disconnect().await;
        result
    }

    // ── Transport callbacks ──────────────────────────────────────

    pub fn on_open(&self) {
        info!(url = %self.inner.config.url, "transport opened");
    }

    pub fn on_close(&self, code: Option<u16>, reason: &str) {
        info!(?code, reason, "transport closed");
        self.mark_not_listening();
    }

    pub fn on_error(&self, error: &str) {
        warn!(error, "transport error");
        self.mark_not_listening();
    }

    fn mark_not_listening(&self) {
        self.inner.flags.set(SessionFlag::ListeningActive, false);
        self.inner
            .connection_state
            .send_replace(ConnectionState::NotListening);
    }

    /// Handle one inbound text frame.
    ///
    /// Malformed, unknown and unrecognized frames are dropped silently.
    pub async fn on_message(&self, raw: &str) {
        match Inbound::parse(raw) {
            Some(Inbound::Result(frame)) => self.handle_result(&frame).await,
            Some(Inbound::Event(frame)) => self.handle_event(&frame).await,
            None => {}
        }
    }

    async fn handle_result(&self, frame: &ResultFrame) {
        if frame.success == Some(false) {
            warn!(message_id = %frame.message_id, result = %frame.result, "command failed");
        }

        match frame.message_id.as_str() {
            START_LISTENING_ID => {
                let Some(state) = frame.state() else {
                    debug!("start_listening result without state");
                    return;
                };
                {
                    let mut store = self.inner.store.lock().await;
                    store.replace_live_snapshot(state.clone());
                    self.publish(&store);
                }
                self.inner.flags.set(SessionFlag::ListeningActive, true);
                debug!(collections = state.len(), "live snapshot replaced");
            }
            POLL_REFRESH_ID => self.inner.flags.set(SessionFlag::PollRefreshed, true),
            other => trace!(message_id = other, "ignoring result"),
        }
    }

    async fn handle_event(&self, frame: &EventFrame) {
        let Some(rule) = self.inner.classification.lookup(&frame.event) else {
            trace!(event = %frame.event, "ignoring unclassified event");
            return;
        };
        let Some(property) = rule.property_name(frame.name()) else {
            debug!(event = %frame.event, "event has no property name");
            return;
        };
        let Some(value) = frame.field(&rule.value_field).cloned() else {
            debug!(
                event = %frame.event,
                field = %rule.value_field,
                "event is missing its value field"
            );
            return;
        };

        {
            let mut store = self.inner.store.lock().await;
            match rule.target {
                EventTarget::Cached => {
                    store.update_cached_property(&frame.serial_number, property, value);
                }
                EventTarget::Live => {
                    let collection = frame.collection();
                    if !store.update_live_property(
                        &collection,
                        &frame.serial_number,
                        property,
                        value,
                    ) {
                        debug!(
                            %collection,
                            serial_number = %frame.serial_number,
                            property,
                            "no live record for event"
                        );
                    }
                }
            }
            self.publish(&store);
        }

        self.inner.last_event.send_replace(Some(Utc::now()));
        debug!(
            event = %frame.event,
            serial_number = %frame.serial_number,
            property,
            "event applied"
        );
    }

    /// Publish the store's merged state. Subscribers are woken even when
    /// it equals the previous one: a repeated event is still an event.
    fn publish(&self, store: &StateStore) -> Arc<MergedState> {
        let merged = Arc::new(store.merged());
        self.inner.published.send_replace(merged.clone());
        merged
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Serialize and send a command. No response correlation.
    pub async fn send_command(&self, command: &OutboundCommand) -> Result<(), CoreError> {
        let sender = self
            .inner
            .sender
            .lock()
            .await
            .clone()
            .ok_or(CoreError::NotConnected)?;

        debug!(command = %command.command(), "sending command");
        sender.send(command).await?;
        Ok(())
    }

    pub async fn start_listening(&self) -> Result<(), CoreError> {
        self.send_command(&OutboundCommand::StartListening).await
    }

    pub async fn poll_refresh(&self) -> Result<(), CoreError> {
        self.send_command(&OutboundCommand::PollRefresh).await
    }

    /// Ask for a station's or device's properties. The reply arrives as an
    /// uncorrelated result.
    pub async fn get_properties(
        &self,
        device_type: DeviceType,
        serial_number: &str,
    ) -> Result<(), CoreError> {
        self.send_command(&OutboundCommand::GetProperties {
            target: CommandTarget::from(device_type),
            serial_number: serial_number.to_owned(),
        })
        .await
    }

    pub async fn get_properties_metadata(
        &self,
        device_type: DeviceType,
        serial_number: &str,
    ) -> Result<(), CoreError> {
        self.send_command(&OutboundCommand::GetPropertiesMetadata {
            target: CommandTarget::from(device_type),
            serial_number: serial_number.to_owned(),
        })
        .await
    }

    /// Turn a device's RTSP stream on or off.
    pub async fn set_rtsp(&self, serial_number: &str, enabled: bool) -> Result<(), CoreError> {
        self.send_command(&OutboundCommand::SetRtspStream {
            serial_number: serial_number.to_owned(),
            value: enabled,
        })
        .await
    }

    // ── State observation ────────────────────────────────────────

    /// The last published merged state.
    pub fn snapshot(&self) -> Arc<MergedState> {
        self.inner.published.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream {
        StateStream::new(self.inner.published.subscribe())
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn is_listening(&self) -> bool {
        self.inner.flags.get(SessionFlag::ListeningActive)
    }

    /// When the last poll refresh was acknowledged.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_refresh.borrow()
    }

    /// When the last recognized event was applied.
    pub fn last_event(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_event.borrow()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Feed link events to the coordinator, one at a time, in link order.
async fn dispatch_task(
    coordinator: Coordinator,
    mut events: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("transport event channel closed");
                    break;
                };
                match event {
                    TransportEvent::Opened => coordinator.on_open(),
                    TransportEvent::Message(text) => coordinator.on_message(&text).await,
                    TransportEvent::Closed { code, reason } => coordinator.on_close(code, &reason),
                    TransportEvent::Error(error) => coordinator.on_error(&error),
                }
            }
        }
    }
}

/// Periodically poll-refresh. A failed tick keeps the last snapshot.
async fn refresh_task(coordinator: Coordinator, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match cancel.run_until_cancelled(coordinator.refresh()).await {
                    Some(Ok(_)) => trace!("periodic refresh complete"),
                    Some(Err(e)) => warn!(error = %e, "periodic refresh failed"),
                    None => break,
                }
            }
        }
    }
}
