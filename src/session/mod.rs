//! Multi-account session management.
//!
//! This module owns the persisted picture of "who is logged in": the
//! account list, the active account, and the merge/switch/remove rules
//! that keep them consistent. Storage is behind the [`SessionRepository`]
//! seam so tests can run against memory.

mod account;
mod repo;
mod session;
mod store;

pub use account::{
    avatar_initials, local_part, validate_email, validate_password, Account, PasswordCheck,
    Preferences, Theme,
};
pub use repo::{FileRepository, MemoryRepository, SessionRepository, SESSION_FILE};
pub use session::Session;
pub use store::SessionStore;
