//! HTTP client for the upstream mail, account, and domain APIs.
//!
//! Every call is one-shot: transient failures surface once as a typed
//! error, never retried here. The bearer credential is attached to every
//! request and must stay server-side; it is never exposed to callers.

use std::time::Duration;

use reqwest::header;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{MailwatchError, Result};

use super::types::{
    AccountInfo, ApiEnvelope, CredentialsRequest, DeleteManyRequest, Domain, FullMessage,
    MailboxInfo, MessagePage, OutgoingMessage, SearchQuery,
};

/// Configuration for [`ApiClient`].
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Base URL of the upstream API, e.g. `https://uapi.example.com`.
    pub base_url: String,
    /// Bearer credential attached to every request.
    pub bearer_token: String,
    /// Per-request timeout. Zero means the reqwest default.
    pub timeout: Duration,
}

/// Typed client over the upstream HTTP API.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client, failing fast when the base URL or credential is
    /// missing (the proxy cannot operate without them).
    pub fn new(config: &ApiConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(MailwatchError::NotConfigured("api.base_url"));
        }
        if config.bearer_token.is_empty() {
            return Err(MailwatchError::NotConfigured("api.bearer_token"));
        }

        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
            .map_err(|_| MailwatchError::NotConfigured("api.bearer_token"))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Unwrap the `{success, data, error}` envelope into `data` or a
    /// typed error.
    async fn unwrap_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let envelope: ApiEnvelope<T> = response.json().await?;
        if !envelope.success {
            return Err(MailwatchError::Api {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "unknown upstream error".to_string()),
            });
        }
        envelope.data.ok_or(MailwatchError::Api {
            status: status.as_u16(),
            message: "missing data in successful response".to_string(),
        })
    }

    /// Like [`Self::unwrap_envelope`] but for endpoints whose successful
    /// response carries no payload.
    async fn check_envelope(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let envelope: ApiEnvelope<serde_json::Value> = response.json().await?;
        if envelope.success {
            Ok(())
        } else {
            Err(MailwatchError::Api {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "unknown upstream error".to_string()),
            })
        }
    }

    /// Create a mailbox account.
    ///
    /// An upstream rejection maps to [`MailwatchError::AccountCreationFailed`]
    /// so callers can distinguish "never created" from "created but
    /// unconfirmed"; they must not fabricate a local identity on failure.
    pub async fn create_account(&self, email: &str, password: &str) -> Result<AccountInfo> {
        debug!(%email, "creating account");
        let response = self
            .http
            .post(self.url("/accounts/create"))
            .json(&CredentialsRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        Self::unwrap_envelope(response).await.map_err(|e| match e {
            MailwatchError::Api { message, .. } => MailwatchError::AccountCreationFailed(message),
            other => other,
        })
    }

    /// Log into an existing mailbox account.
    pub async fn login(&self, email: &str, password: &str) -> Result<AccountInfo> {
        debug!(%email, "logging in");
        let response = self
            .http
            .post(self.url("/accounts/login"))
            .json(&CredentialsRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        Self::unwrap_envelope(response).await.map_err(|e| match e {
            MailwatchError::Api { message, .. } => MailwatchError::LoginFailed(message),
            other => other,
        })
    }

    /// List the signup domains offered by the service.
    pub async fn list_domains(&self) -> Result<Vec<Domain>> {
        let response = self.http.get(self.url("/domains")).send().await?;
        Self::unwrap_envelope(response).await
    }

    /// List messages in a folder, paginated.
    pub async fn list_messages(
        &self,
        account_id: &str,
        folder: &str,
        page: u32,
        per_page: u32,
    ) -> Result<MessagePage> {
        let response = self
            .http
            .get(self.url(&format!("/accounts/{account_id}/emails")))
            .query(&[
                ("folder", folder.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    /// Fetch a single message.
    pub async fn get_message(&self, account_id: &str, message_id: &str) -> Result<FullMessage> {
        let response = self
            .http
            .get(self.url(&format!("/accounts/{account_id}/emails/{message_id}")))
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    /// Search messages with the given filters.
    pub async fn search_messages(
        &self,
        account_id: &str,
        query: &SearchQuery,
    ) -> Result<MessagePage> {
        let response = self
            .http
            .get(self.url(&format!("/accounts/{account_id}/emails/search")))
            .query(&query.to_params())
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }

    /// Send a message from the given account.
    pub async fn send_message(
        &self,
        account_id: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/accounts/{account_id}/send")))
            .json(message)
            .send()
            .await?;
        Self::check_envelope(response).await?;
        Ok(())
    }

    /// Delete a single message.
    pub async fn delete_message(&self, account_id: &str, message_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/accounts/{account_id}/emails/{message_id}")))
            .send()
            .await?;
        Self::check_envelope(response).await?;
        Ok(())
    }

    /// Delete several messages in one call.
    pub async fn delete_messages(&self, account_id: &str, message_ids: &[String]) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/accounts/{account_id}/emails/delete-multiple")))
            .json(&DeleteManyRequest {
                ids: message_ids.to_vec(),
            })
            .send()
            .await?;
        Self::check_envelope(response).await?;
        Ok(())
    }

    /// Fetch mailbox metadata (storage used vs. assigned quota).
    pub async fn account_info(&self, account_id: &str) -> Result<MailboxInfo> {
        let response = self
            .http
            .get(self.url(&format!("/accounts/{account_id}/info")))
            .send()
            .await?;
        Self::unwrap_envelope(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str, token: &str) -> ApiConfig {
        ApiConfig {
            base_url: base.to_string(),
            bearer_token: token.to_string(),
            timeout: Duration::ZERO,
        }
    }

    #[test]
    fn test_missing_base_url_fails_fast() {
        let err = ApiClient::new(&config("", "tok")).unwrap_err();
        assert!(matches!(err, MailwatchError::NotConfigured("api.base_url")));
    }

    #[test]
    fn test_missing_token_fails_fast() {
        let err = ApiClient::new(&config("https://uapi.example.com", "")).unwrap_err();
        assert!(matches!(
            err,
            MailwatchError::NotConfigured("api.bearer_token")
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = ApiClient::new(&config("https://uapi.example.com/", "tok")).unwrap();
        assert_eq!(
            client.url("/domains"),
            "https://uapi.example.com/domains"
        );
    }
}
