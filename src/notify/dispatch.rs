//! Notification fan-out: callback registry, unread counter, refresh
//! broadcast, and the debounce gate for the secondary OS notification.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::protocol::EmailNotification;

/// Handle returned from callback registration, consumed to unregister.
///
/// Tokens make the registry explicit: each live token receives exactly one
/// invocation per event, and dropping a listener means revoking its token,
/// not comparing function identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type Callback = Arc<dyn Fn(&EmailNotification) + Send + Sync>;

/// Fan-out hub for inbound notifications.
///
/// Every accepted event unconditionally (a) invokes all registered
/// callbacks, each behind its own panic boundary, (b) increments the
/// unread counter, and (c) broadcasts on the refresh channel. The
/// debounce gate in [`Debouncer`] governs only the optional OS popup.
pub struct Dispatcher {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(CallbackId, Callback)>>,
    unread: AtomicU64,
    refresh_tx: broadcast::Sender<EmailNotification>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (refresh_tx, _) = broadcast::channel(64);
        Self {
            next_id: AtomicU64::new(1),
            callbacks: Mutex::new(Vec::new()),
            unread: AtomicU64::new(0),
            refresh_tx,
        }
    }

    /// Register a callback, returning its revocation token.
    pub fn register<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&EmailNotification) + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        callbacks.push((id, Arc::new(callback)));
        debug!(total = callbacks.len(), "notification callback registered");
        id
    }

    /// Remove the callback behind `id`. Returns `false` if the token was
    /// already consumed or never issued.
    pub fn unregister(&self, id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        callbacks.len() != before
    }

    /// Drop all registered callbacks.
    pub fn clear(&self) {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of live callbacks.
    pub fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// True if no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver one event: callbacks, unread counter, refresh broadcast.
    ///
    /// Iterates a snapshot of the registry so a callback that registers or
    /// unregisters listeners mid-dispatch cannot skip or double-invoke
    /// entries within this dispatch. A panicking callback is logged and
    /// does not stop the others.
    pub fn dispatch(&self, notification: &EmailNotification) {
        let snapshot: Vec<(CallbackId, Callback)> = {
            let callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
            callbacks.clone()
        };

        for (id, callback) in &snapshot {
            let result = catch_unwind(AssertUnwindSafe(|| callback(notification)));
            if result.is_err() {
                warn!(callback = ?id, "notification callback panicked");
            }
        }

        self.unread.fetch_add(1, Ordering::Relaxed);
        // No receivers is fine; the UI may not be listening yet.
        let _ = self.refresh_tx.send(notification.clone());
    }

    /// Unread new-mail count since the last reset.
    pub fn unread_count(&self) -> u64 {
        self.unread.load(Ordering::Relaxed)
    }

    /// Reset the unread counter (the mailbox list was reloaded).
    pub fn reset_unread(&self) {
        self.unread.store(0, Ordering::Relaxed);
    }

    /// Subscribe to the process-wide refresh feed. Each accepted event is
    /// broadcast once, carrying the triggering notification.
    pub fn subscribe(&self) -> broadcast::Receiver<EmailNotification> {
        self.refresh_tx.subscribe()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Debounce gate for the secondary (OS-level) notification.
///
/// An event whose de-duplication key matches the most recently shown key
/// within the window is suppressed; a distinct key re-arms the window.
/// This gate never applies to callback fan-out or the unread counter.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Decide whether the secondary notification for `key` should be
    /// shown at `now`. Records the key when it is shown.
    pub fn observe(&mut self, key: &str, now: Instant) -> bool {
        if let Some((last_key, shown_at)) = &self.last {
            if last_key == key && now.duration_since(*shown_at) < self.window {
                return false;
            }
        }
        self.last = Some((key.to_string(), now));
        true
    }
}
