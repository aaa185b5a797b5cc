//! Session persistence backends.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::session::Session;

/// File name of the persisted session blob.
pub const SESSION_FILE: &str = "user-session.json";

/// Storage seam for the persisted session blob.
///
/// Implementations never surface read errors: an unreadable or corrupt
/// blob is reported as absent, not repaired. Write failures are logged
/// and swallowed so a full disk cannot take the UI down.
pub trait SessionRepository: Send + Sync {
    /// Load the persisted session, or `None` if absent or unreadable.
    fn load(&self) -> Option<Session>;

    /// Persist the session. Failures are logged, not returned.
    fn save(&self, session: &Session);

    /// Remove any persisted session data.
    fn clear(&self);
}

/// JSON-file-backed repository under the platform data directory.
pub struct FileRepository {
    path: PathBuf,
}

impl FileRepository {
    /// Repository at the default platform location
    /// (`<data_dir>/mailwatch/user-session.json`).
    pub fn new() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("mailwatch").join(SESSION_FILE),
        }
    }

    /// Repository at an explicit file path.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The file this repository reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRepository for FileRepository {
    fn load(&self) -> Option<Session> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no persisted session");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt session blob, treating as absent");
                None
            }
        }
    }

    fn save(&self, session: &Session) {
        let json = match serde_json::to_string_pretty(session) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize session");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "failed to create session directory");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "failed to persist session");
        }
    }

    fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove session blob");
            }
        }
    }
}

/// In-memory repository for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Option<Session>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemoryRepository {
    fn load(&self) -> Option<Session> {
        self.inner.lock().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, session: &Session) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(session.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = None;
        }
    }
}
