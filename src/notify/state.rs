//! Connection lifecycle state machine.

use serde::Serialize;

/// Lifecycle state of the notification connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Attempting to establish the transport.
    #[default]
    Connecting,
    /// Transport is up; handshake not yet acknowledged.
    Connected,
    /// Server acknowledged authentication.
    Authenticated,
    /// Server acknowledged the room subscription; pushes will flow.
    RoomJoined,
    /// Feature unavailable or permanently given up. Terminal.
    Disabled,
}

impl ConnectionState {
    /// Check if transition to target state is valid.
    ///
    /// The handshake advances Connecting -> Connected -> Authenticated ->
    /// RoomJoined. Any live state may fall back to Connecting on a
    /// transport drop, or to Disabled; Disabled is terminal.
    pub fn can_transition_to(&self, target: ConnectionState) -> bool {
        use ConnectionState::*;
        if *self == Disabled {
            return false;
        }
        match (*self, target) {
            (_, Disabled) => true,
            (Connecting, Connected) => true,
            (Connected, Authenticated) => true,
            (Authenticated, RoomJoined) => true,
            (Connected | Authenticated | RoomJoined, Connecting) => true,
            _ => false,
        }
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: ConnectionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::MailwatchError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disabled)
    }

    /// Check if the transport is up (handshake may still be pending).
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::Authenticated | ConnectionState::RoomJoined
        )
    }
}

/// Coarse tri-state surface for passive display in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl From<ConnectionState> for ConnectionStatus {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Disabled => ConnectionStatus::Disconnected,
            ConnectionState::Connecting => ConnectionStatus::Connecting,
            _ => ConnectionStatus::Connected,
        }
    }
}
