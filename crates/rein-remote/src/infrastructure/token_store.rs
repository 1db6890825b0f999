//! Persisted authentication token.
//!
//! The remote remembers the last token it was given so that a later launch
//! without one still authenticates. On disk it is a one-key TOML file in the
//! Rein config directory:
//!
//! ```toml
//! rein_auth_token = "4f9c..."
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const TOKEN_FILE_NAME: &str = "remote.toml";

/// Error type for token persistence.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing token file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse token file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize token file: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Where the remote keeps its token between runs.
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, TokenStoreError>;
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rein_auth_token: Option<String>,
}

/// TOML-file token store.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `remote.toml` inside the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns [`TokenStoreError::NoPlatformConfigDir`] if the environment
    /// does not name a config directory.
    pub fn in_config_dir() -> Result<Self, TokenStoreError> {
        let dir = rein_core::platform::config_dir().ok_or(TokenStoreError::NoPlatformConfigDir)?;
        Ok(Self::new(dir.join(TOKEN_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(TokenStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: TokenFile = toml::from_str(&content)?;
        Ok(file.rein_auth_token.filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| TokenStoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string(&TokenFile {
            rein_auth_token: Some(token.to_string()),
        })?;
        std::fs::write(&self.path, content).map_err(|source| TokenStoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-process token store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.token.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }
}

/// Picks the token to connect with.
///
/// A non-empty `url_token` wins and is persisted when it differs from the
/// stored one. Otherwise the stored token is used. Storage failures are
/// logged and never block connecting.
pub fn resolve_token(url_token: Option<&str>, store: &dyn TokenStore) -> Option<String> {
    let stored = match store.load() {
        Ok(stored) => stored,
        Err(e) => {
            warn!("could not read stored token: {e}");
            None
        }
    };

    match url_token.filter(|t| !t.is_empty()) {
        Some(token) => {
            if stored.as_deref() != Some(token) {
                match store.save(token) {
                    Ok(()) => info!("remembered new auth token"),
                    Err(e) => warn!("could not persist auth token: {e}"),
                }
            }
            Some(token.to_string())
        }
        None => stored,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> FileTokenStore {
        FileTokenStore::new(
            std::env::temp_dir()
                .join(format!("rein-remote-test-{}", Uuid::new_v4()))
                .join(TOKEN_FILE_NAME),
        )
    }

    fn cleanup(store: &FileTokenStore) {
        if let Some(dir) = store.path().parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_file_store_missing_file_loads_none() {
        assert_eq!(temp_store().load().unwrap(), None);
    }

    #[test]
    fn test_file_store_save_then_load() {
        // Arrange
        let store = temp_store();

        // Act
        store.save("s3cret").unwrap();
        let loaded = store.load().unwrap();

        // Assert
        assert_eq!(loaded.as_deref(), Some("s3cret"));
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("rein_auth_token"));
        cleanup(&store);
    }

    #[test]
    fn test_file_store_malformed_file_is_parse_error() {
        let store = temp_store();
        store.save("x").unwrap();
        std::fs::write(store.path(), "rein_auth_token = ").unwrap();

        assert!(matches!(store.load(), Err(TokenStoreError::Parse(_))));
        cleanup(&store);
    }

    #[test]
    fn test_in_config_dir_uses_fixed_file_name() {
        if let Ok(store) = FileTokenStore::in_config_dir() {
            assert!(store.path().ends_with(TOKEN_FILE_NAME));
        }
    }

    #[test]
    fn test_resolve_prefers_url_token_and_persists_it() {
        // Arrange
        let store = MemoryTokenStore::with_token("old");

        // Act
        let token = resolve_token(Some("new"), &store);

        // Assert
        assert_eq!(token.as_deref(), Some("new"));
        assert_eq!(store.load().unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_resolve_falls_back_to_stored_token() {
        let store = MemoryTokenStore::with_token("kept");
        assert_eq!(resolve_token(None, &store).as_deref(), Some("kept"));
        assert_eq!(resolve_token(Some(""), &store).as_deref(), Some("kept"));
    }

    #[test]
    fn test_resolve_without_any_token_is_none() {
        assert_eq!(resolve_token(None, &MemoryTokenStore::new()), None);
    }

    #[test]
    fn test_resolve_does_not_rewrite_identical_token() {
        let mut store = MockTokenStore::new();
        store.expect_load().returning(|| Ok(Some("same".into())));
        store.expect_save().never();

        assert_eq!(resolve_token(Some("same"), &store).as_deref(), Some("same"));
    }

    #[test]
    fn test_resolve_survives_storage_failures() {
        // Arrange
        let mut store = MockTokenStore::new();
        store.expect_load().returning(|| Err(TokenStoreError::NoPlatformConfigDir));
        store
            .expect_save()
            .times(1)
            .returning(|_| Err(TokenStoreError::NoPlatformConfigDir));

        // Act / Assert
        assert_eq!(resolve_token(Some("fresh"), &store).as_deref(), Some("fresh"));
    }
}
