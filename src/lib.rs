//! # mailwatch
//!
//! Client-side core for a hosted disposable-email service: multi-account
//! session management and real-time new-mail notifications.
//!
//! All durable mail state lives behind the upstream HTTP API; this crate
//! is the orchestration layer in front of it.
//!
//! ## Features
//!
//! - **Multi-account sessions**: persisted account list with merge,
//!   switch, and remove semantics behind an injectable storage seam
//! - **Real-time notifications**: reconnecting push-channel client with
//!   an acknowledgment-driven handshake, exponential backoff, and
//!   debounced desktop notifications
//! - **Typed API client**: accounts, domains, and mailbox operations
//!   over the upstream HTTP API
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailwatch::{NotificationClient, NotifyConfig, SessionStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging
//!     mailwatch::logging::try_init().ok();
//!
//!     // Open the persisted session
//!     let store = SessionStore::open_default();
//!     let session = store.initialize();
//!
//!     // Start the notification client for the active account
//!     let client = NotificationClient::new(NotifyConfig::for_endpoint(
//!         "wss://push.example.com/ws",
//!     ));
//!     client.connect();
//!     if let Some(account) = session.current_account() {
//!         client.force_authenticate(&account.id, &account.email);
//!     }
//!
//!     // React to new mail
//!     let mut refresh = client.subscribe_refresh();
//!     while let Ok(notification) = refresh.recv().await {
//!         println!("new mail from {}", notification.from);
//!     }
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod session;

// Re-export commonly used types
pub use api::{ApiClient, ApiConfig, SearchQuery};
pub use config::Config;
pub use error::{MailwatchError, Result};
pub use notify::{
    CallbackId, ConnectionState, ConnectionStatus, EmailNotification, NotificationClient,
    NotifyConfig, SecondaryNotifier,
};
pub use session::{Account, Session, SessionRepository, SessionStore};
