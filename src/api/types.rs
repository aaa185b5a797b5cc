//! Upstream API request and response types.

use serde::{Deserialize, Serialize};

/// Envelope wrapping every upstream response.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request body for account creation and login.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Identity data returned by the account API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A signup domain offered by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub account_count: u64,
    #[serde(default)]
    pub email_count: u64,
}

/// One row in a mailbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageSummary {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub has_attachments: bool,
}

/// A full message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FullMessage {
    pub id: String,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub date: String,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInfo>,
}

/// Attachment metadata (content fetched separately).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttachmentInfo {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

/// One page of a mailbox listing or search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<MessageSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

/// Search filters. Unset fields are omitted from the query string.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub folder: Option<String>,
    pub sender: Option<String>,
    pub has_attachment: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl SearchQuery {
    /// Render the filters as query-string pairs.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = &self.query {
            params.push(("q", q.clone()));
        }
        if let Some(folder) = &self.folder {
            params.push(("folder", folder.clone()));
        }
        if let Some(sender) = &self.sender {
            params.push(("sender", sender.clone()));
        }
        if let Some(has) = self.has_attachment {
            params.push(("has_attachment", has.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            params.push(("per_page", per_page.to_string()));
        }
        params
    }
}

/// Request body for sending a message.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Request body for bulk deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteManyRequest {
    pub ids: Vec<String>,
}

/// Mailbox metadata: storage quota usage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailboxInfo {
    pub email: String,
    /// Bytes used.
    pub storage_used: u64,
    /// Bytes assigned.
    pub storage_assigned: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success() {
        let raw = r#"{"success": true, "data": {"id": "a1", "email": "x@d.com"}}"#;
        let env: ApiEnvelope<AccountInfo> = serde_json::from_str(raw).unwrap();
        assert!(env.success);
        assert_eq!(env.data.unwrap().id, "a1");
        assert!(env.error.is_none());
    }

    #[test]
    fn test_envelope_failure() {
        let raw = r#"{"success": false, "error": "email already taken"}"#;
        let env: ApiEnvelope<AccountInfo> = serde_json::from_str(raw).unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
        assert_eq!(env.error.as_deref(), Some("email already taken"));
    }

    #[test]
    fn test_search_query_params() {
        let query = SearchQuery {
            query: Some("invoice".into()),
            folder: Some("inbox".into()),
            has_attachment: Some(true),
            page: Some(2),
            ..SearchQuery::default()
        };
        let params = query.to_params();
        assert!(params.contains(&("q", "invoice".to_string())));
        assert!(params.contains(&("folder", "inbox".to_string())));
        assert!(params.contains(&("has_attachment", "true".to_string())));
        assert!(params.contains(&("page", "2".to_string())));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_empty_search_query_has_no_params() {
        assert!(SearchQuery::default().to_params().is_empty());
    }

    #[test]
    fn test_message_page_parse() {
        let raw = r#"{
            "messages": [
                {"id": "m1", "from": "a@b.c", "subject": "hi", "date": "2026-08-24T00:00:00Z"}
            ],
            "page": 1, "per_page": 20, "total": 1
        }"#;
        let page: MessagePage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert!(!page.messages[0].is_read);
    }
}
