//! The notification client: one logical subscription to the push channel
//! per authenticated identity.
//!
//! The client owns a single background task driving the socket. The
//! handshake is acknowledgment-driven: `authenticate` goes out after the
//! transport connects, and `join_email_room` only after the server's
//! `authenticated` ack, so a slow server can never race the join.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::dispatch::{CallbackId, Debouncer, Dispatcher};
use super::notifier::{DesktopNotifier, NullNotifier, SecondaryNotifier};
use super::protocol::{
    encode_client_event, parse_server_event, ClientEvent, EmailNotification, ServerEvent,
};
use super::state::{ConnectionState, ConnectionStatus};

/// Tuning knobs for the notification client.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// WebSocket endpoint. Empty, `"undefined"`, or `"null"` means the
    /// feature is unconfigured and the client is born disabled.
    pub endpoint: String,
    /// Reconnection attempt budget before permanently giving up.
    pub max_reconnect_attempts: u32,
    /// Initial reconnection delay.
    pub base_delay: Duration,
    /// Reconnection delay cap.
    pub max_delay: Duration,
    /// Debounce window for the secondary OS notification.
    pub debounce: Duration,
    /// Whether to show secondary OS notifications at all.
    pub show_notifications: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            max_reconnect_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            debounce: Duration::from_secs(2),
            show_notifications: true,
        }
    }
}

impl NotifyConfig {
    /// Config pointing at `endpoint` with default tuning.
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Whether the endpoint denotes a configured notification server.
    ///
    /// Environment plumbing tends to stringify absent values, so the
    /// literal strings `"undefined"` and `"null"` count as unconfigured.
    pub fn endpoint_is_usable(&self) -> bool {
        !self.endpoint.is_empty() && self.endpoint != "undefined" && self.endpoint != "null"
    }
}

/// Identity used for the authentication handshake. Survives reconnects.
#[derive(Debug, Clone)]
struct Identity {
    user_id: String,
    email: String,
    token: Option<String>,
}

/// Snapshot of the client's connection state for passive display.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub is_connected: bool,
    pub is_enabled: bool,
    pub reconnect_attempts: u32,
    pub state: ConnectionState,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

/// Why a live connection ended.
enum DropReason {
    /// Either endpoint closed the channel on purpose; do not reconnect.
    IntentionalClose,
    /// Transport failure; eligible for reconnection.
    Lost,
}

struct Inner {
    config: NotifyConfig,
    /// Once false, never flips back within this instance's lifetime.
    enabled: AtomicBool,
    state: Mutex<ConnectionState>,
    reconnect_attempts: AtomicU32,
    identity: Mutex<Option<Identity>>,
    dispatcher: Dispatcher,
    debouncer: Mutex<Debouncer>,
    notifier: Box<dyn SecondaryNotifier>,
    /// Sender feeding the live connection's write half, if any.
    outbound: Mutex<Option<mpsc::UnboundedSender<ClientEvent>>>,
}

impl Inner {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a state transition, logging (not failing) if the machine
    /// rejects it.
    fn set_state(&self, target: ConnectionState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == target {
            return;
        }
        if let Err(e) = state.transition_to(target) {
            debug!(error = %e, "ignored state transition");
        }
    }

    /// Flip to the permanently-disabled terminal state.
    fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.clear_outbound();
        self.set_state(ConnectionState::Disabled);
    }

    fn set_outbound(&self, tx: mpsc::UnboundedSender<ClientEvent>) {
        let mut outbound = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        *outbound = Some(tx);
    }

    fn clear_outbound(&self) {
        let mut outbound = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        *outbound = None;
    }

    /// Queue an event for the live connection. Silently a no-op when no
    /// connection exists.
    fn send_event(&self, event: ClientEvent) -> bool {
        let outbound = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        match outbound.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    fn identity(&self) -> Option<Identity> {
        self.identity.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Deliver one inbound notification: unconditional fan-out, unread
    /// increment, and refresh broadcast; debounced secondary popup.
    fn handle_notification(&self, notification: &EmailNotification) {
        debug!(from = %notification.from, id = %notification.id, "new email notification");
        self.dispatcher.dispatch(notification);

        let show = {
            let mut debouncer = self.debouncer.lock().unwrap_or_else(|e| e.into_inner());
            debouncer.observe(&notification.dedup_key(), Instant::now())
        };
        if show {
            self.notifier.notify(notification);
        }
    }
}

/// Reconnecting client for the new-mail push channel.
///
/// Safe to call from any task; every public method is a no-op (never a
/// panic or error) once the client is disabled or while no transport
/// exists.
pub struct NotificationClient {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationClient {
    /// Create a client. An unusable endpoint yields a permanently
    /// disabled instance that never attempts a connection.
    ///
    /// The secondary sink is the platform notification daemon when
    /// `show_notifications` is set, otherwise a discard sink.
    pub fn new(config: NotifyConfig) -> Self {
        let notifier: Box<dyn SecondaryNotifier> = if config.show_notifications {
            Box::new(DesktopNotifier)
        } else {
            Box::new(NullNotifier)
        };
        Self::with_notifier(config, notifier)
    }

    /// Create a client with an explicit secondary notification sink.
    pub fn with_notifier(config: NotifyConfig, notifier: Box<dyn SecondaryNotifier>) -> Self {
        let usable = config.endpoint_is_usable();
        if !usable {
            debug!("notification endpoint not configured, client disabled");
        }
        let inner = Inner {
            debouncer: Mutex::new(Debouncer::new(config.debounce)),
            config,
            enabled: AtomicBool::new(usable),
            state: Mutex::new(if usable {
                ConnectionState::Connecting
            } else {
                ConnectionState::Disabled
            }),
            reconnect_attempts: AtomicU32::new(0),
            identity: Mutex::new(None),
            dispatcher: Dispatcher::new(),
            notifier,
            outbound: Mutex::new(None),
        };
        Self {
            inner: Arc::new(inner),
            task: Mutex::new(None),
        }
    }

    /// Start the connection task. No-op when disabled or already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        if !self.inner.is_enabled() {
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            return;
        }
        let inner = self.inner.clone();
        *task = Some(tokio::spawn(run_connection_loop(inner)));
    }

    /// Record the identity and authenticate if a transport is up. The
    /// room join follows the server's `authenticated` acknowledgment.
    pub fn force_authenticate(&self, user_id: &str, email: &str) {
        if !self.inner.is_enabled() {
            return;
        }
        {
            let mut identity = self.inner.identity.lock().unwrap_or_else(|e| e.into_inner());
            *identity = Some(Identity {
                user_id: user_id.to_string(),
                email: email.to_string(),
                token: None,
            });
        }
        if self.is_connected() {
            self.inner.send_event(ClientEvent::Authenticate {
                user_id: user_id.to_string(),
                token: None,
            });
        }
    }

    /// Connection health probe; useful when the UI regains foreground
    /// visibility. Has no behavioral effect beyond keeping the transport
    /// warm.
    pub fn ping(&self) {
        if self.inner.is_enabled() && self.is_connected() {
            self.inner.send_event(ClientEvent::Ping);
        }
    }

    /// Tear everything down: transport, timers, callback registry.
    /// Idempotent and terminal.
    pub fn disconnect(&self) {
        self.inner.disable();
        self.inner.dispatcher.clear();
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }

    /// Register a new-mail callback, returning its revocation token.
    pub fn on_new_email<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&EmailNotification) + Send + Sync + 'static,
    {
        self.inner.dispatcher.register(callback)
    }

    /// Remove the callback behind `id`.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        self.inner.dispatcher.unregister(id)
    }

    /// Drop all registered callbacks.
    pub fn clear_callbacks(&self) {
        self.inner.dispatcher.clear();
    }

    /// Subscribe to the process-wide refresh feed. Every accepted inbound
    /// notification is broadcast here for the mailbox list to re-fetch.
    pub fn subscribe_refresh(&self) -> broadcast::Receiver<EmailNotification> {
        self.inner.dispatcher.subscribe()
    }

    /// Unread new-mail count since the last reset.
    pub fn new_email_count(&self) -> u64 {
        self.inner.dispatcher.unread_count()
    }

    /// Reset the unread counter (the mailbox list was reloaded).
    pub fn reset_new_email_count(&self) {
        self.inner.dispatcher.reset_unread();
    }

    /// Whether the client is still willing to operate.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    /// Whether the transport is currently up.
    pub fn is_connected(&self) -> bool {
        self.inner.state().is_connected()
    }

    /// True iff the push channel is usable right now.
    pub fn is_available(&self) -> bool {
        self.inner.is_enabled() && self.is_connected()
    }

    /// Coarse tri-state for passive display.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.state().into()
    }

    /// Detailed status snapshot.
    pub fn status(&self) -> StatusReport {
        let identity = self.inner.identity();
        let state = self.inner.state();
        StatusReport {
            is_connected: state.is_connected(),
            is_enabled: self.inner.is_enabled(),
            reconnect_attempts: self.inner.reconnect_attempts.load(Ordering::SeqCst),
            state,
            user_id: identity.as_ref().map(|i| i.user_id.clone()),
            user_email: identity.map(|i| i.email),
        }
    }
}

impl Drop for NotificationClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Connect, drive, reconnect with backoff, give up when exhausted.
async fn run_connection_loop(inner: Arc<Inner>) {
    let mut backoff = Backoff::new(
        inner.config.base_delay,
        inner.config.max_delay,
        inner.config.max_reconnect_attempts,
    );

    while inner.is_enabled() {
        inner.set_state(ConnectionState::Connecting);
        match connect_async(inner.config.endpoint.as_str()).await {
            Ok((stream, _response)) => {
                info!(endpoint = %inner.config.endpoint, "notification channel connected");
                backoff.reset();
                inner.reconnect_attempts.store(0, Ordering::SeqCst);
                inner.set_state(ConnectionState::Connected);

                let reason = drive_connection(&inner, stream).await;
                inner.clear_outbound();

                if matches!(reason, DropReason::IntentionalClose) {
                    info!("notification channel closed intentionally, disabling");
                    inner.disable();
                    return;
                }
                inner.set_state(ConnectionState::Connecting);
            }
            Err(e) => {
                warn!(endpoint = %inner.config.endpoint, error = %e, "notification connect failed");
            }
        }

        if !inner.is_enabled() {
            return;
        }
        match backoff.next_delay() {
            Some(delay) => {
                inner
                    .reconnect_attempts
                    .store(backoff.attempts(), Ordering::SeqCst);
                debug!(delay_ms = delay.as_millis() as u64, "scheduling reconnect");
                tokio::time::sleep(delay).await;
            }
            None => {
                warn!("max reconnection attempts reached, disabling notifications");
                inner.disable();
                return;
            }
        }
    }
}

/// Drive one live connection until it drops.
async fn drive_connection(
    inner: &Arc<Inner>,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> DropReason {
    let (mut sink, mut stream) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
    inner.set_outbound(tx);

    // Reconnect case: identity already known, re-authenticate immediately.
    if let Some(identity) = inner.identity() {
        inner.send_event(ClientEvent::Authenticate {
            user_id: identity.user_id,
            token: identity.token,
        });
    }

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(event) => match encode_client_event(&event) {
                        Ok(json) => {
                            if sink.send(Message::Text(json.into())).await.is_err() {
                                return DropReason::Lost;
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to encode outbound event"),
                    },
                    // Sender gone: disconnect() tore the client down.
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        return DropReason::IntentionalClose;
                    }
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => handle_frame(inner, text.as_str()),
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            return DropReason::Lost;
                        }
                    }
                    Some(Ok(Message::Close(_))) => return DropReason::IntentionalClose,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "notification stream error");
                        return DropReason::Lost;
                    }
                    None => return DropReason::Lost,
                }
            }
        }
    }
}

/// Process one inbound frame. Malformed frames are logged and dropped.
fn handle_frame(inner: &Arc<Inner>, raw: &str) {
    match parse_server_event(raw) {
        Ok(ServerEvent::Authenticated) => {
            inner.set_state(ConnectionState::Authenticated);
            match inner.identity().map(|i| i.email) {
                Some(email) => {
                    inner.send_event(ClientEvent::JoinEmailRoom { email });
                }
                None => debug!("authenticated without a stored email, skipping room join"),
            }
        }
        Ok(ServerEvent::RoomJoined) => {
            debug!("email room joined");
            inner.set_state(ConnectionState::RoomJoined);
        }
        Ok(ServerEvent::NewEmailNotification(notification)) => {
            inner.handle_notification(&notification);
        }
        Ok(ServerEvent::Pong) => {
            // Connection is healthy.
        }
        Err(e) => warn!(error = %e, "dropping malformed notification frame"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct RecordingNotifier(Arc<Mutex<Vec<String>>>);

    impl SecondaryNotifier for RecordingNotifier {
        fn notify(&self, notification: &EmailNotification) {
            self.0.lock().unwrap().push(notification.id.clone());
        }
    }

    fn silent_client(endpoint: &str) -> NotificationClient {
        NotificationClient::with_notifier(
            NotifyConfig::for_endpoint(endpoint),
            Box::new(NullNotifier),
        )
    }

    fn notification(id: &str, timestamp: i64) -> EmailNotification {
        EmailNotification {
            from: "a@b.c".into(),
            subject: "s".into(),
            timestamp,
            id: id.into(),
        }
    }

    #[test]
    fn test_undefined_endpoint_disables_forever() {
        let client = silent_client("undefined");
        assert!(!client.is_enabled());
        assert!(!client.is_available());
        assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
        assert_eq!(client.status().state, ConnectionState::Disabled);

        // Every method is a safe no-op
        client.force_authenticate("u1", "x@d.com");
        client.ping();
        client.disconnect();
        assert!(!client.is_enabled());
    }

    #[test]
    fn test_empty_and_null_endpoints_disable() {
        assert!(!silent_client("").is_enabled());
        assert!(!silent_client("null").is_enabled());
        assert!(silent_client("ws://localhost:9000").is_enabled());
    }

    #[test]
    fn test_disconnect_is_idempotent_and_terminal() {
        let client = silent_client("ws://localhost:9000");
        assert!(client.is_enabled());

        client.disconnect();
        assert!(!client.is_enabled());
        assert_eq!(client.status().state, ConnectionState::Disabled);

        client.disconnect();
        assert!(!client.is_enabled());
    }

    #[test]
    fn test_disconnect_clears_callbacks() {
        let client = silent_client("ws://localhost:9000");
        client.on_new_email(|_| {});
        client.disconnect();
        assert!(client.inner.dispatcher.is_empty());
    }

    #[test]
    fn test_force_authenticate_records_identity() {
        let client = silent_client("ws://localhost:9000");
        client.force_authenticate("u1", "x@d.com");

        let status = client.status();
        assert_eq!(status.user_id.as_deref(), Some("u1"));
        assert_eq!(status.user_email.as_deref(), Some("x@d.com"));
        // No transport yet, so nothing was sent and nothing broke
        assert!(!status.is_connected);
    }

    #[test]
    fn test_authenticated_ack_triggers_room_join() {
        let client = silent_client("ws://localhost:9000");
        client.force_authenticate("u1", "x@d.com");

        // Simulate a live transport
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.inner.set_outbound(tx);
        {
            let mut state = client.inner.state.lock().unwrap();
            *state = ConnectionState::Connected;
        }

        handle_frame(&client.inner, r#"{"event":"authenticated"}"#);
        assert_eq!(client.inner.state(), ConnectionState::Authenticated);
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::JoinEmailRoom {
                email: "x@d.com".into()
            }
        );

        handle_frame(&client.inner, r#"{"event":"room_joined"}"#);
        assert_eq!(client.inner.state(), ConnectionState::RoomJoined);
    }

    #[test]
    fn test_authenticated_without_identity_skips_join() {
        let client = silent_client("ws://localhost:9000");
        let (tx, mut rx) = mpsc::unbounded_channel();
        client.inner.set_outbound(tx);
        {
            let mut state = client.inner.state.lock().unwrap();
            *state = ConnectionState::Connected;
        }

        handle_frame(&client.inner, r#"{"event":"authenticated"}"#);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let client = silent_client("ws://localhost:9000");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        client.on_new_email(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        handle_frame(&client.inner, "not json");
        handle_frame(&client.inner, r#"{"event":"mystery"}"#);
        handle_frame(
            &client.inner,
            r#"{"event":"new_email_notification","data":{"from":"a@b.c"}}"#,
        );

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(client.new_email_count(), 0);
    }

    #[test]
    fn test_notification_fan_out_and_counter() {
        let client = silent_client("ws://localhost:9000");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        client.on_new_email(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let mut refresh = client.subscribe_refresh();

        client.inner.handle_notification(&notification("m-1", 1));
        client.inner.handle_notification(&notification("m-1", 1));

        // Fan-out and counter fire for every event, duplicates included
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(client.new_email_count(), 2);
        assert_eq!(refresh.try_recv().unwrap().id, "m-1");
        assert_eq!(refresh.try_recv().unwrap().id, "m-1");

        client.reset_new_email_count();
        assert_eq!(client.new_email_count(), 0);
    }

    #[test]
    fn test_duplicate_event_suppresses_secondary_only() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let client = NotificationClient::with_notifier(
            NotifyConfig::for_endpoint("ws://localhost:9000"),
            Box::new(RecordingNotifier(shown.clone())),
        );

        // Identical dedup key twice within the window
        client.inner.handle_notification(&notification("m-1", 5));
        client.inner.handle_notification(&notification("m-2", 5));
        // Distinct timestamp re-arms the window
        client.inner.handle_notification(&notification("m-3", 6));

        let shown = shown.lock().unwrap();
        assert_eq!(shown.as_slice(), ["m-1", "m-3"]);
        assert_eq!(client.new_email_count(), 3);
    }

    #[test]
    fn test_status_report_shape() {
        let client = silent_client("ws://localhost:9000");
        let status = client.status();
        assert!(status.is_enabled);
        assert!(!status.is_connected);
        assert_eq!(status.reconnect_attempts, 0);
        assert_eq!(status.state, ConnectionState::Connecting);
        assert!(status.user_id.is_none());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "connecting");
    }
}
