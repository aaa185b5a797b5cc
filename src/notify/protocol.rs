//! Wire protocol for the notification channel.
//!
//! Every frame is a JSON object tagged with an `event` field and an
//! optional `data` payload. Inbound frames that do not match the schema
//! are rejected by [`parse_server_event`], never passed through untyped.

use serde::{Deserialize, Serialize};

use crate::error::{MailwatchError, Result};

/// Events sent from the client to the notification server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Authentication handshake, sent first after connecting.
    Authenticate {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    /// Subscribe to new-mail pushes for a mailbox. Only valid after the
    /// server has acknowledged authentication.
    JoinEmailRoom { email: String },
    /// Connection health probe.
    Ping,
}

/// Events pushed from the notification server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Acknowledges [`ClientEvent::Authenticate`]; the room join may be
    /// sent once this arrives.
    Authenticated,
    /// Acknowledges [`ClientEvent::JoinEmailRoom`].
    RoomJoined,
    /// A new message arrived in the subscribed mailbox.
    NewEmailNotification(EmailNotification),
    /// Reply to [`ClientEvent::Ping`].
    Pong,
}

/// Minimal envelope describing one new message. Ephemeral: used only to
/// trigger a refresh and display a notification, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailNotification {
    pub from: String,
    pub subject: String,
    /// Server-side arrival time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(alias = "uid")]
    pub id: String,
}

impl EmailNotification {
    /// De-duplication key for the secondary (OS-level) notification.
    ///
    /// Two pushes with the same sender, subject, and timestamp are the
    /// same message as far as the user-visible popup is concerned.
    pub fn dedup_key(&self) -> String {
        format!("{}-{}-{}", self.from, self.subject, self.timestamp)
    }
}

/// Parse an inbound frame, rejecting anything that does not match the
/// tagged schema.
pub fn parse_server_event(raw: &str) -> Result<ServerEvent> {
    serde_json::from_str(raw).map_err(|e| MailwatchError::Protocol(e.to_string()))
}

/// Serialize an outbound frame.
pub fn encode_client_event(event: &ClientEvent) -> Result<String> {
    serde_json::to_string(event).map_err(MailwatchError::from)
}
