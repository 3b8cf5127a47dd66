//! Token store implementations
//!
//! The token store is a small string key-value store. The interceptor only
//! ever touches one key, [`AUTH_TOKENS_KEY`], holding JSON-serialized
//! [`AuthTokens`].

use super::types::AuthTokens;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Fixed key under which the token record is persisted
pub const AUTH_TOKENS_KEY: &str = "auth_tokens";

/// Persistent string key-value storage
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read the persisted token record from the store.
///
/// Missing, unreadable, and unparseable values all read as `None`.
pub async fn read_tokens(store: &dyn TokenStore, key: &str) -> Option<AuthTokens> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Token store read failed, treating as signed out: {e}");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(tokens) => Some(tokens),
        Err(e) => {
            debug!("Ignoring unparseable token record under '{key}': {e}");
            None
        }
    }
}

/// Persist a token record, overwriting the previous one
pub async fn save_tokens(store: &dyn TokenStore, key: &str, tokens: &AuthTokens) -> Result<()> {
    let json = serde_json::to_string(tokens)?;
    store.set(key, &json).await
}

/// Delete the persisted token record
pub async fn clear_tokens(store: &dyn TokenStore, key: &str) -> Result<()> {
    store.remove(key).await
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local token store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// Token store persisted as a JSON object on disk.
///
/// Every write rewrites the whole file through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl FileTokenStore {
    /// Create a store backed by `path`. The file is created on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Arc::new(RwLock::new(())),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                Error::token_store(format!(
                    "Failed to parse token file {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Error::token_store(format!(
                "Failed to read token file {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::token_store(format!("Failed to create token directory: {e}"))
                })?;
                // Only directories created here are tightened
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    tokio::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
                        .await
                        .map_err(|e| {
                            Error::token_store(format!("Failed to restrict token directory: {e}"))
                        })?;
                }
            }
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        let write_err =
            |e: std::io::Error| Error::token_store(format!("Failed to write token file: {e}"));

        // A stale temp file would keep its old mode
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(write_err(e));
            }
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.create_new(true).write(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&temp_path).await.map_err(write_err)?;
        file.write_all(contents.as_bytes()).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::token_store(format!("Failed to rename token file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.read().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.write().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.write().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries).await
    }
}
