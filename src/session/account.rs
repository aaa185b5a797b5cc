//! Account model and local helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UI theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Per-account user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            language: "en".to_string(),
            notifications: true,
        }
    }
}

/// A single mailbox identity known to the local session.
///
/// The `password` field is persisted so the account can be switched back to
/// without re-entering credentials. The upstream login protocol requires a
/// replayable credential; see the repository design notes before changing
/// this to a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Opaque identifier issued by the account API.
    pub id: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    #[serde(rename = "domain_id", skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

impl Account {
    /// Build an account from identity data returned by the account API.
    pub fn from_api(
        id: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        display_name: Option<String>,
        domain_id: Option<String>,
        status: Option<String>,
    ) -> Self {
        let email = email.into();
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: display_name.or_else(|| Some(local_part(&email).to_string())),
            avatar: Some(avatar_initials(&email)),
            password: password.into(),
            is_active: true,
            created_at: now,
            last_login_at: now,
            domain_id,
            status: status.or_else(|| Some("active".to_string())),
            preferences: Preferences::default(),
            email,
        }
    }

    /// Build a purely local identity with a synthetic id.
    ///
    /// Never returned implicitly on API failure; callers must opt in to an
    /// offline identity (demo mode), and it is marked with `domain_id:
    /// "mock"` so nothing mistakes it for a server-backed account.
    pub fn local(
        email: impl Into<String>,
        password: impl Into<String>,
        display_name: Option<String>,
    ) -> Self {
        Self::from_api(
            synthetic_id(),
            email,
            password,
            display_name,
            Some("mock".to_string()),
            Some("active".to_string()),
        )
    }

    /// Merge freshly obtained fields into this account.
    ///
    /// Identity (`email`) is unchanged; everything else is overwritten and
    /// `last_login_at` is refreshed.
    pub fn merge_from(&mut self, other: &Account) {
        self.id = other.id.clone();
        self.password = other.password.clone();
        if other.display_name.is_some() {
            self.display_name = other.display_name.clone();
        }
        if other.avatar.is_some() {
            self.avatar = other.avatar.clone();
        }
        self.is_active = other.is_active;
        if other.domain_id.is_some() {
            self.domain_id = other.domain_id.clone();
        }
        if other.status.is_some() {
            self.status = other.status.clone();
        }
        self.last_login_at = Utc::now();
    }
}

/// The local part of an email address (everything before `@`).
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Avatar initials derived from the email local part.
pub fn avatar_initials(email: &str) -> String {
    local_part(email)
        .chars()
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

/// Generate a synthetic account id for purely local identities.
fn synthetic_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("acc_{}_{:04x}", Utc::now().timestamp_millis(), seq)
}

/// Check that an address has the basic `local@domain.tld` shape.
pub fn validate_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || local.contains(char::is_whitespace) {
        return false;
    }
    let mut labels = domain.split('.');
    let Some(first) = labels.next() else {
        return false;
    };
    if first.is_empty() || first.contains(char::is_whitespace) {
        return false;
    }
    let mut saw_tld = false;
    for label in labels {
        if label.is_empty() || label.contains(char::is_whitespace) {
            return false;
        }
        saw_tld = true;
    }
    saw_tld
}

/// Result of a password strength check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Validate password strength, returning every violated rule.
pub fn validate_password(password: &str) -> PasswordCheck {
    let mut errors = Vec::new();

    if password.len() < 8 {
        errors.push("Password must be at least 8 characters long".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number".to_string());
    }

    PasswordCheck {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_api_defaults() {
        let account = Account::from_api("a1", "box@tmp.dev", "pw", None, None, None);
        assert_eq!(account.id, "a1");
        assert_eq!(account.display_name.as_deref(), Some("box"));
        assert_eq!(account.avatar.as_deref(), Some("BO"));
        assert_eq!(account.status.as_deref(), Some("active"));
        assert!(account.is_active);
        assert_eq!(account.preferences, Preferences::default());
    }

    #[test]
    fn test_local_account_is_marked_mock() {
        let account = Account::local("demo@tmp.dev", "pw", None);
        assert!(account.id.starts_with("acc_"));
        assert_eq!(account.domain_id.as_deref(), Some("mock"));
    }

    #[test]
    fn test_merge_refreshes_last_login() {
        let mut existing = Account::from_api("a1", "box@tmp.dev", "old", None, None, None);
        let before = existing.last_login_at;

        let incoming = Account::from_api("a2", "box@tmp.dev", "new", None, None, None);
        existing.merge_from(&incoming);

        assert_eq!(existing.id, "a2");
        assert_eq!(existing.password, "new");
        assert!(existing.last_login_at >= before);
    }

    #[test]
    fn test_merge_preserves_existing_optional_fields() {
        let mut existing = Account::from_api(
            "a1",
            "box@tmp.dev",
            "pw",
            Some("Boxy".into()),
            Some("7".into()),
            None,
        );
        let mut incoming = Account::from_api("a1", "box@tmp.dev", "pw", None, None, None);
        incoming.display_name = None;
        incoming.domain_id = None;
        existing.merge_from(&incoming);

        assert_eq!(existing.display_name.as_deref(), Some("Boxy"));
        assert_eq!(existing.domain_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_avatar_initials() {
        assert_eq!(avatar_initials("jo@x.dev"), "JO");
        assert_eq!(avatar_initials("a@x.dev"), "A");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("box@tmp.dev"));
        assert!(validate_email("a.b@mail.example.org"));
        assert!(!validate_email("box"));
        assert!(!validate_email("box@tmp"));
        assert!(!validate_email("@tmp.dev"));
        assert!(!validate_email("box@tmp.dev@x"));
        assert!(!validate_email("bo x@tmp.dev"));
    }

    #[test]
    fn test_validate_password_collects_all_errors() {
        let check = validate_password("short");
        assert!(!check.is_valid);
        assert_eq!(check.errors.len(), 3);

        let check = validate_password("LongEnough1");
        assert!(check.is_valid);
        assert!(check.errors.is_empty());
    }

    #[test]
    fn test_account_serde_camel_case() {
        let account = Account::from_api("a1", "box@tmp.dev", "pw", None, Some("9".into()), None);
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["displayName"], "box");
        assert_eq!(json["domain_id"], "9");
        assert_eq!(json["isActive"], true);
        assert!(json["lastLoginAt"].is_string());
    }
}
