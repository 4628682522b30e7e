//! Login credentials and the bearer-token session.
//!
//! The session is an explicit value handed to every remote call. A single
//! `SessionStore` holds the live one: login is its only writer, logout clears
//! it, and every request reads a snapshot at the moment it starts.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Username/password pair submitted once at login.
#[derive(Clone, Default, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session: who is logged in and the token the server issued.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub token: String,
}

impl Session {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Shared holder of the live session, optionally mirrored to disk.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
    file: Option<PathBuf>,
}

impl SessionStore {
    /// A store that only lives in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store persisted to `file`. A previously saved session is loaded
    /// immediately; an unreadable file is ignored.
    pub fn persistent(file: PathBuf) -> Self {
        let restored = load_session(&file);
        if restored.is_some() {
            debug!(path = %file.display(), "restored saved session");
        }
        Self {
            inner: Arc::new(RwLock::new(restored)),
            file: Some(file),
        }
    }

    /// Default location of the persisted session file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("drive-tui").join("session.json"))
    }

    /// Snapshot of the current session, if logged in.
    pub fn current(&self) -> Option<Session> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.current().is_some()
    }

    /// Install a new session (login). The live session is installed even
    /// when saving it to disk fails; the save error is still returned.
    pub fn set(&self, session: Session) -> Result<()> {
        let saved = match &self.file {
            Some(path) => save_session(path, &session),
            None => Ok(()),
        };
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }
        saved
    }

    /// Drop the session (logout). Removing the saved file is best-effort.
    pub fn clear(&self) {
        match self.inner.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        if let Some(path) = &self.file {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove saved session");
                }
            }
        }
    }
}

fn load_session(path: &Path) -> Option<Session> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Session>(&content) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable session file");
            None
        }
    }
}

fn save_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(session)?;
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let mut file = options.open(path)?;
        // `mode` only applies on creation; tighten a file left by an older run.
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        file.write_all(json.as_bytes())?;
    }
    #[cfg(not(unix))]
    {
        let mut file = options.open(path)?;
        file.write_all(json.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_value() {
        let session = Session::new("alice", "t0k3n");
        assert_eq!(session.bearer(), "Bearer t0k3n");
    }

    #[test]
    fn debug_redacts_secrets() {
        let session = Session::new("alice", "t0k3n");
        let creds = Credentials {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{:?}", session).contains("t0k3n"));
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn set_and_clear_in_memory() {
        let store = SessionStore::in_memory();
        assert!(!store.is_logged_in());
        store.set(Session::new("alice", "abc")).unwrap();
        assert_eq!(store.current().unwrap().username, "alice");
        store.clear();
        assert!(store.current().is_none());
    }

    #[test]
    fn clones_share_the_same_session() {
        let store = SessionStore::in_memory();
        let reader = store.clone();
        store.set(Session::new("bob", "xyz")).unwrap();
        assert_eq!(reader.current().unwrap().token, "xyz");
        store.clear();
        assert!(!reader.is_logged_in());
    }

    #[test]
    fn persistent_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = SessionStore::persistent(path.clone());
        assert!(!store.is_logged_in());
        store.set(Session::new("carol", "persisted")).unwrap();
        assert!(path.exists());

        let restored = SessionStore::persistent(path.clone());
        assert_eq!(restored.current(), Some(Session::new("carol", "persisted")));

        restored.clear();
        assert!(!path.exists());
    }

    #[test]
    fn failed_save_still_installs_session() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let store = SessionStore::persistent(blocker.join("session.json"));
        assert!(store.set(Session::new("dave", "live")).is_err());
        assert_eq!(store.current(), Some(Session::new("dave", "live")));
    }

    #[cfg(unix)]
    #[test]
    fn saved_session_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "stale").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = SessionStore::persistent(path.clone());
        store.set(Session::new("erin", "secret")).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(
            SessionStore::persistent(path).current(),
            Some(Session::new("erin", "secret"))
        );
    }

    #[test]
    fn corrupt_session_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SessionStore::persistent(path);
        assert!(!store.is_logged_in());
    }
}
