//! Typed client for the upstream HTTP APIs (mail, accounts, domains).

mod client;
mod types;

pub use client::{ApiClient, ApiConfig};
pub use types::{
    AccountInfo, ApiEnvelope, AttachmentInfo, CredentialsRequest, DeleteManyRequest, Domain,
    FullMessage, MailboxInfo, MessagePage, MessageSummary, OutgoingMessage, SearchQuery,
};
