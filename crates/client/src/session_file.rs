//! Persistence of the bearer token across runs.
//!
//! Only the token is written. The user record is always refetched from the
//! server, so a stale role or name can never be resurrected from disk.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when reading or writing the session file.
#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("Session file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// Location of the persisted session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token, if any.
    ///
    /// A missing file is not an error. A corrupt file is reported so the
    /// caller can decide to [`clear`](Self::clear) it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<SecretString>, SessionFileError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredSession = serde_json::from_str(&raw)?;
        if stored.token.trim().is_empty() {
            return Ok(None);
        }

        debug!(path = %self.path.display(), "Loaded session token");
        Ok(Some(SecretString::from(stored.token)))
    }

    /// Write the token, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, token: &SecretString) -> Result<(), SessionFileError> {
        let body = serde_json::to_vec(&StoredSession {
            token: token.expose_secret().to_owned(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so a crash never leaves a half-written token
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Remove the stored token. Succeeds if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<(), SessionFileError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove session file");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_file() -> SessionFile {
        SessionFile::new(
            std::env::temp_dir().join(format!("lending-session-{}.json", uuid::Uuid::new_v4())),
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_no_session() {
        let file = temp_file();
        assert!(file.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let file = temp_file();
        file.save(&SecretString::from("tok-123")).await.unwrap();

        let loaded = file.load().await.unwrap().unwrap();
        assert_eq!(loaded.expose_secret(), "tok-123");

        file.clear().await.unwrap();
        assert!(file.load().await.unwrap().is_none());
        // Clearing twice is fine
        file.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_only_token_is_written() {
        let file = temp_file();
        file.save(&SecretString::from("abc")).await.unwrap();

        let raw = tokio::fs::read_to_string(file.path()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "token": "abc" }));

        file.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let file = temp_file();
        tokio::fs::write(file.path(), b"{not json").await.unwrap();
        assert!(matches!(file.load().await, Err(SessionFileError::Corrupt(_))));
        file.clear().await.unwrap();
    }
}
