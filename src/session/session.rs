//! The persisted multi-account session and its mutation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::Account;

/// The singleton session blob.
///
/// Invariants upheld by every mutation:
/// - at most one account per distinct email (adding an existing email
///   merges instead of duplicating);
/// - a non-empty `current_account_id` always references an element of
///   `accounts`; if `accounts` is empty, `current_account_id` is empty;
/// - `last_activity` advances on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Id of the active account, or empty when logged out.
    pub current_account_id: String,
    /// Known accounts in insertion order.
    pub accounts: Vec<Account>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// A fresh, logged-out session.
    pub fn new() -> Self {
        Self {
            current_account_id: String::new(),
            accounts: Vec::new(),
            last_activity: Utc::now(),
        }
    }

    /// Add an account, or merge into the entry with the same email.
    ///
    /// The given account always becomes current (sign-in-on-add). On merge
    /// the existing entry keeps its position and its `last_login_at` is
    /// refreshed.
    pub fn add_or_update_account(&mut self, account: Account) {
        match self.accounts.iter_mut().find(|a| a.email == account.email) {
            Some(existing) => {
                existing.merge_from(&account);
                self.current_account_id = existing.id.clone();
            }
            None => {
                self.current_account_id = account.id.clone();
                self.accounts.push(account);
            }
        }
        self.touch();
    }

    /// Look up the active account.
    ///
    /// Tolerates a dangling `current_account_id` by returning `None`.
    pub fn current_account(&self) -> Option<&Account> {
        if self.current_account_id.is_empty() {
            return None;
        }
        self.accounts
            .iter()
            .find(|a| a.id == self.current_account_id)
    }

    /// Make the account with `account_id` current.
    ///
    /// Returns `false` (leaving the session untouched) if the id is
    /// unknown. Refreshes the account's `last_login_at` on success.
    pub fn switch_account(&mut self, account_id: &str) -> bool {
        let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) else {
            return false;
        };
        account.last_login_at = Utc::now();
        self.current_account_id = account_id.to_string();
        self.touch();
        true
    }

    /// Remove the account with `account_id`.
    ///
    /// If it was current, the first remaining account is promoted, or the
    /// current id is cleared when none remain. Unknown ids leave the list
    /// unchanged but still refresh `last_activity`.
    pub fn remove_account(&mut self, account_id: &str) {
        self.accounts.retain(|a| a.id != account_id);
        if self.current_account_id == account_id {
            self.current_account_id = self
                .accounts
                .first()
                .map(|a| a.id.clone())
                .unwrap_or_default();
        }
        self.touch();
    }

    /// Clear the active account but keep the account list (soft logout).
    pub fn logout(&mut self) {
        self.current_account_id.clear();
        self.touch();
    }

    /// True iff an account is active.
    pub fn is_logged_in(&self) -> bool {
        !self.current_account_id.is_empty() && !self.accounts.is_empty()
    }

    /// Update preferences of the given account. Returns `false` if unknown.
    pub fn update_preferences<F>(&mut self, account_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut super::account::Preferences),
    {
        let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) else {
            return false;
        };
        f(&mut account.preferences);
        self.touch();
        true
    }

    /// Update the display name of the given account. Returns `false` if
    /// unknown.
    pub fn update_display_name(&mut self, account_id: &str, display_name: &str) -> bool {
        let Some(account) = self.accounts.iter_mut().find(|a| a.id == account_id) else {
            return false;
        };
        account.display_name = Some(display_name.to_string());
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::account::Theme;

    fn account(id: &str, email: &str) -> Account {
        Account::from_api(id, email, "pw", None, None, None)
    }

    #[test]
    fn test_new_session_is_logged_out() {
        let session = Session::new();
        assert!(session.current_account_id.is_empty());
        assert!(session.accounts.is_empty());
        assert!(!session.is_logged_in());
        assert!(session.current_account().is_none());
    }

    #[test]
    fn test_add_account_signs_in() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));

        assert!(session.is_logged_in());
        assert_eq!(session.current_account().unwrap().id, "a1");
        assert_eq!(session.accounts.len(), 1);
    }

    #[test]
    fn test_add_same_email_merges() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));
        let first_login = session.accounts[0].last_login_at;

        session.add_or_update_account(account("a2", "x@d.com"));

        assert_eq!(session.accounts.len(), 1);
        assert_eq!(session.accounts[0].id, "a2");
        assert_eq!(session.current_account_id, "a2");
        assert!(session.accounts[0].last_login_at >= first_login);
    }

    #[test]
    fn test_add_second_account_becomes_current() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));
        session.add_or_update_account(account("a2", "y@d.com"));

        assert_eq!(session.accounts.len(), 2);
        assert_eq!(session.current_account_id, "a2");
        // Insertion order preserved
        assert_eq!(session.accounts[0].id, "a1");
    }

    #[test]
    fn test_switch_account() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));
        session.add_or_update_account(account("a2", "y@d.com"));

        assert!(session.switch_account("a1"));
        assert_eq!(session.current_account_id, "a1");
    }

    #[test]
    fn test_switch_to_unknown_is_noop() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));
        let before = session.clone();

        assert!(!session.switch_account("nope"));
        assert_eq!(session.current_account_id, before.current_account_id);
        assert_eq!(session.accounts, before.accounts);
    }

    #[test]
    fn test_remove_current_promotes_first_remaining() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));
        session.add_or_update_account(account("a2", "y@d.com"));
        session.switch_account("a1");

        session.remove_account("a1");
        assert_eq!(session.current_account_id, "a2");
        assert_eq!(session.accounts.len(), 1);
    }

    #[test]
    fn test_remove_last_account_logs_out() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));

        session.remove_account("a1");
        assert_eq!(session.current_account_id, "");
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_remove_non_current_keeps_current() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));
        session.add_or_update_account(account("a2", "y@d.com"));

        session.remove_account("a1");
        assert_eq!(session.current_account_id, "a2");
    }

    #[test]
    fn test_logout_keeps_accounts() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));

        session.logout();
        assert!(!session.is_logged_in());
        assert_eq!(session.accounts.len(), 1);
    }

    #[test]
    fn test_current_account_invariant_over_random_ops() {
        let mut session = Session::new();
        let check = |s: &Session| {
            if s.accounts.is_empty() {
                assert!(s.current_account_id.is_empty());
            } else if !s.current_account_id.is_empty() {
                assert!(s.accounts.iter().any(|a| a.id == s.current_account_id));
            }
        };

        session.add_or_update_account(account("a1", "x@d.com"));
        check(&session);
        session.add_or_update_account(account("a2", "y@d.com"));
        check(&session);
        session.switch_account("a1");
        check(&session);
        session.remove_account("a2");
        check(&session);
        session.remove_account("a1");
        check(&session);
        session.add_or_update_account(account("a3", "z@d.com"));
        check(&session);
        session.logout();
        check(&session);
    }

    #[test]
    fn test_update_preferences() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));

        assert!(session.update_preferences("a1", |p| p.theme = Theme::Dark));
        assert_eq!(session.accounts[0].preferences.theme, Theme::Dark);
        assert!(!session.update_preferences("nope", |p| p.theme = Theme::Light));
    }

    #[test]
    fn test_update_display_name() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));

        assert!(session.update_display_name("a1", "Box"));
        assert_eq!(session.accounts[0].display_name.as_deref(), Some("Box"));
        assert!(!session.update_display_name("nope", "Box"));
    }

    #[test]
    fn test_session_serde_round_trip() {
        let mut session = Session::new();
        session.add_or_update_account(account("a1", "x@d.com"));

        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("currentAccountId"));
        assert!(json.contains("lastActivity"));

        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
