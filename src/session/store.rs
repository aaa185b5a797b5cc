//! Session store: the front door over a [`SessionRepository`].

use std::sync::{Arc, Mutex};

use tracing::debug;

use super::account::Account;
use super::repo::{FileRepository, SessionRepository};
use super::session::Session;

/// Single source of truth for "who is logged in, as whom, across how many
/// accounts".
///
/// Wraps a [`SessionRepository`] with an in-process cache so repeated reads
/// do not hit storage, and persists after every mutation. Safe to share
/// across tasks; individual operations take the internal lock.
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    cache: Mutex<Option<Session>>,
}

impl SessionStore {
    /// Store over an explicit repository (inject [`MemoryRepository`] in
    /// tests).
    ///
    /// [`MemoryRepository`]: super::repo::MemoryRepository
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            repo,
            cache: Mutex::new(None),
        }
    }

    /// Store over the default file-backed repository.
    pub fn open_default() -> Self {
        Self::new(Arc::new(FileRepository::new()))
    }

    /// Return the existing session, creating and persisting an empty one if
    /// none exists. Never fails; storage errors mean "no session".
    pub fn initialize(&self) -> Session {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = cache.as_ref() {
            return session.clone();
        }
        let session = match self.repo.load() {
            Some(session) => session,
            None => {
                debug!("no persisted session, creating a fresh one");
                let session = Session::new();
                self.repo.save(&session);
                session
            }
        };
        *cache = Some(session.clone());
        session
    }

    /// The persisted session, or `None` if storage is empty or unreadable.
    pub fn load(&self) -> Option<Session> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.is_none() {
            *cache = self.repo.load();
        }
        cache.clone()
    }

    /// Persist the given session and adopt it as the cached state.
    pub fn save(&self, session: &Session) {
        self.repo.save(session);
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = Some(session.clone());
    }

    /// Add (or merge) an account and make it current. Returns the updated
    /// session.
    pub fn add_or_update_account(&self, account: Account) -> Session {
        self.mutate(|session| {
            session.add_or_update_account(account);
        })
    }

    /// The active account, or `None` when logged out or dangling.
    pub fn get_current_account(&self) -> Option<Account> {
        self.load()
            .and_then(|session| session.current_account().cloned())
    }

    /// All known accounts in insertion order.
    pub fn all_accounts(&self) -> Vec<Account> {
        self.load().map(|s| s.accounts).unwrap_or_default()
    }

    /// Switch to the account with `account_id`.
    ///
    /// Returns `None` (nothing persisted) if no session exists or the id is
    /// unknown.
    pub fn switch_account(&self, account_id: &str) -> Option<Session> {
        let mut session = self.load()?;
        if !session.switch_account(account_id) {
            return None;
        }
        self.save(&session);
        Some(session)
    }

    /// Remove the account with `account_id`, reassigning the current
    /// account as needed. Returns `None` only when no session exists.
    pub fn remove_account(&self, account_id: &str) -> Option<Session> {
        let mut session = self.load()?;
        session.remove_account(account_id);
        self.save(&session);
        Some(session)
    }

    /// Update preferences of the given account.
    pub fn update_preferences<F>(&self, account_id: &str, f: F) -> Option<Session>
    where
        F: FnOnce(&mut super::account::Preferences),
    {
        let mut session = self.load()?;
        if !session.update_preferences(account_id, f) {
            return None;
        }
        self.save(&session);
        Some(session)
    }

    /// Update the display name of the given account.
    pub fn update_display_name(&self, account_id: &str, display_name: &str) -> Option<Session> {
        let mut session = self.load()?;
        if !session.update_display_name(account_id, display_name) {
            return None;
        }
        self.save(&session);
        Some(session)
    }

    /// True iff a session exists with an active account.
    pub fn is_logged_in(&self) -> bool {
        self.load().map(|s| s.is_logged_in()).unwrap_or(false)
    }

    /// Clear the active account but keep the account list.
    pub fn logout(&self) {
        if let Some(mut session) = self.load() {
            session.logout();
            self.save(&session);
        }
    }

    /// Full reset: drop the cached state and remove persisted data.
    pub fn clear_all(&self) {
        self.repo.clear();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = None;
    }

    fn mutate<F>(&self, f: F) -> Session
    where
        F: FnOnce(&mut Session),
    {
        let mut session = self.initialize();
        f(&mut session);
        self.save(&session);
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::repo::MemoryRepository;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryRepository::new()))
    }

    fn account(id: &str, email: &str) -> Account {
        Account::from_api(id, email, "pw", None, None, None)
    }

    #[test]
    fn test_initialize_creates_and_persists() {
        let store = store();
        assert!(store.load().is_none());

        let session = store.initialize();
        assert!(!session.is_logged_in());
        assert!(store.load().is_some());
    }

    #[test]
    fn test_initialize_returns_existing() {
        let store = store();
        store.add_or_update_account(account("a1", "x@d.com"));

        let session = store.initialize();
        assert_eq!(session.current_account_id, "a1");
    }

    #[test]
    fn test_add_account_logs_in() {
        let store = store();
        store.add_or_update_account(account("a1", "x@d.com"));

        assert!(store.is_logged_in());
        assert_eq!(store.get_current_account().unwrap().id, "a1");
    }

    #[test]
    fn test_switch_unknown_returns_none() {
        let store = store();
        store.add_or_update_account(account("a1", "x@d.com"));

        assert!(store.switch_account("nope").is_none());
        assert_eq!(store.get_current_account().unwrap().id, "a1");
    }

    #[test]
    fn test_remove_current_promotes_next() {
        let store = store();
        store.add_or_update_account(account("a1", "x@d.com"));
        store.add_or_update_account(account("a2", "y@d.com"));
        store.switch_account("a1").unwrap();

        let session = store.remove_account("a1").unwrap();
        assert_eq!(session.current_account_id, "a2");
    }

    #[test]
    fn test_remove_last_account_logs_out() {
        let store = store();
        store.add_or_update_account(account("a1", "x@d.com"));

        let session = store.remove_account("a1").unwrap();
        assert_eq!(session.current_account_id, "");
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_logout_keeps_accounts() {
        let store = store();
        store.add_or_update_account(account("a1", "x@d.com"));

        store.logout();
        assert!(!store.is_logged_in());
        assert_eq!(store.all_accounts().len(), 1);
    }

    #[test]
    fn test_clear_all_resets() {
        let store = store();
        store.add_or_update_account(account("a1", "x@d.com"));

        store.clear_all();
        assert!(store.load().is_none());
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_merge_does_not_duplicate() {
        let store = store();
        store.add_or_update_account(account("a1", "x@d.com"));
        store.add_or_update_account(account("a2", "x@d.com"));

        let accounts = store.all_accounts();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, "a2");
    }

    #[test]
    fn test_cache_survives_repo_mutation() {
        // The cache is authoritative after a save even if the repository
        // is wiped behind the store's back.
        let repo = Arc::new(MemoryRepository::new());
        let store = SessionStore::new(repo.clone());
        store.add_or_update_account(account("a1", "x@d.com"));

        repo.clear();
        assert!(store.is_logged_in());
    }
}
