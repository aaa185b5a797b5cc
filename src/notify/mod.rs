//! Real-time new-mail notifications.
//!
//! One [`NotificationClient`] per authenticated session holds one logical
//! subscription to the server push channel: connect, authenticate, join
//! the mailbox room, then fan inbound events out to registered callbacks
//! and the process-wide refresh feed. Reconnection is automatic with
//! exponential backoff; exhaustion or an intentional close permanently
//! disables the instance.

mod backoff;
mod client;
mod dispatch;
mod notifier;
mod protocol;
mod state;

pub use backoff::Backoff;
pub use client::{NotificationClient, NotifyConfig, StatusReport};
pub use dispatch::{CallbackId, Debouncer, Dispatcher};
pub use notifier::{DesktopNotifier, NullNotifier, SecondaryNotifier};
pub use protocol::{
    encode_client_event, parse_server_event, ClientEvent, EmailNotification, ServerEvent,
};
pub use state::{ConnectionState, ConnectionStatus};
