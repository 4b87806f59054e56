//! Persisted login sessions.
//!
//! A session is the browser's cookie jar written to a JSON file after a
//! successful login. Its age is the file's modification time; sessions
//! older than the configured maximum are purged instead of replayed.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::write_json_atomic;
use crate::browser::{Browser, BrowserCookie};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session file {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write session {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to delete session {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A loaded cookie jar and when it was written.
#[derive(Debug, Clone)]
pub struct SessionArtifact {
    pub cookies: Vec<BrowserCookie>,
    pub modified: SystemTime,
}

impl SessionArtifact {
    /// Age relative to `now`. Clock skew into the future counts as fresh.
    pub fn age_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.modified).unwrap_or_default()
    }
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the persisted cookie jar, `None` when no session was saved.
    pub fn load(&self) -> Result<Option<SessionArtifact>, SessionError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.read_error(source)),
        };
        let modified = self.modified()?.unwrap_or_else(SystemTime::now);

        let cookies: Vec<BrowserCookie> =
            serde_json::from_str(&contents).map_err(|source| SessionError::Parse {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            "Loaded {} cookies from {}",
            cookies.len(),
            self.path.display()
        );
        Ok(Some(SessionArtifact { cookies, modified }))
    }

    /// Age of the persisted session, `None` when there is none.
    pub fn age(&self) -> Result<Option<Duration>, SessionError> {
        self.age_at(SystemTime::now())
    }

    pub fn age_at(&self, now: SystemTime) -> Result<Option<Duration>, SessionError> {
        Ok(self
            .modified()?
            .map(|modified| now.duration_since(modified).unwrap_or_default()))
    }

    /// Whether the session is older than `max_age`. A missing session is expired.
    pub fn is_expired(&self, max_age: Duration) -> Result<bool, SessionError> {
        self.is_expired_at(max_age, SystemTime::now())
    }

    pub fn is_expired_at(&self, max_age: Duration, now: SystemTime) -> Result<bool, SessionError> {
        Ok(match self.age_at(now)? {
            Some(age) => age > max_age,
            None => true,
        })
    }

    /// Persist a cookie jar, replacing any previous session.
    pub fn save(&self, cookies: &[BrowserCookie]) -> Result<(), SessionError> {
        write_json_atomic(&self.path, cookies).map_err(|source| SessionError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(
            "Saved session ({} cookies) to {}",
            cookies.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the session file. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool, SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SessionError::Delete {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Forget the session everywhere: the file on disk and the cookies
    /// live in the browser. Browser failures are logged, not returned.
    pub async fn invalidate(&self, browser: &dyn Browser) -> Result<(), SessionError> {
        if self.remove()? {
            info!("Removed session file {}", self.path.display());
        }
        if let Err(e) = browser.clear_cookies().await {
            warn!("Failed to clear browser cookies: {}", e);
        }
        Ok(())
    }

    fn modified(&self) -> Result<Option<SystemTime>, SessionError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.modified().map(Some).map_err(|e| self.read_error(e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.read_error(e)),
        }
    }

    fn read_error(&self, source: io::Error) -> SessionError {
        SessionError::Read {
            path: self.path.clone(),
            source,
        }
    }
}
