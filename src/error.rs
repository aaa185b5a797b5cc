//! Error types for mailwatch.

use thiserror::Error;

/// Main error type for mailwatch operations.
#[derive(Error, Debug)]
pub enum MailwatchError {
    /// A required endpoint or credential is not configured.
    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    /// Account creation was rejected or could not be confirmed upstream.
    ///
    /// This is deliberately distinct from a transport error: callers must
    /// never fabricate a local account to paper over it.
    #[error("account creation failed: {0}")]
    AccountCreationFailed(String),

    /// Login was rejected by the upstream account API.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The upstream API returned a non-success response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::notify::ConnectionState,
        to: crate::notify::ConnectionState,
    },

    /// Inbound payload did not match the wire schema.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Session blob could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for mailwatch operations.
pub type Result<T> = std::result::Result<T, MailwatchError>;
