//! Secondary (OS-level) notification sinks.

use tracing::warn;

use super::protocol::EmailNotification;

/// Sink for the debounced secondary notification.
///
/// Implementations must never panic or block; failures are logged and
/// swallowed so a broken notification daemon cannot affect mail flow.
pub trait SecondaryNotifier: Send + Sync {
    fn notify(&self, notification: &EmailNotification);
}

/// Desktop notification via the platform notification daemon.
pub struct DesktopNotifier;

impl SecondaryNotifier for DesktopNotifier {
    fn notify(&self, notification: &EmailNotification) {
        let summary = format!("New Email: {}", notification.subject);
        let body = format!("From: {}", notification.from);
        if let Err(e) = notify_rust::Notification::new()
            .summary(&summary)
            .body(&body)
            .appname("mailwatch")
            .show()
        {
            warn!(error = %e, "failed to show desktop notification");
        }
    }
}

/// Discards every notification. Used when the feature is turned off and
/// in tests.
pub struct NullNotifier;

impl SecondaryNotifier for NullNotifier {
    fn notify(&self, _notification: &EmailNotification) {}
}
