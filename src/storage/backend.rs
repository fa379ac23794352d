//! Key-value slot backends
//!
//! A backend is a flat namespace of string keys to string values. It never
//! sees plaintext secrets; `SecureStorage` encrypts before writing.

use crate::error::{Error, Result, ResultExt};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Persistent string slots
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Raw value of a slot, if present
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a slot (last write wins)
    async fn write(&self, key: &str, value: String) -> Result<()>;

    /// Remove a slot; removing a missing slot is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every slot
    async fn clear(&self) -> Result<()>;

    /// Names of all slots
    async fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory slots, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<()> {
        self.slots.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.slots.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.slots.write().await.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.slots.read().await.keys().cloned().collect())
    }
}

/// Slots persisted as a JSON object in a single file.
///
/// Every mutation rewrites the file through a temp file and a rename.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    slots: RwLock<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Open a backend, loading existing slots if the file is present
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let slots = if tokio::fs::try_exists(&path).await? {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::storage(format!("Failed to read store file: {e}")))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| Error::storage(format!("Failed to parse store file: {e}")))?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), slots = slots.len(), "Opened store file");
        Ok(Self {
            path,
            slots: RwLock::new(slots),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(slots)
            .map_err(|e| Error::storage(format!("Failed to serialize store: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::storage(format!("Failed to write store file: {e}")))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::storage(format!("Failed to rename store file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<()> {
        let mut slots = self.slots.write().await;
        slots.insert(key.to_string(), value);
        self.persist(&slots).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.write().await;
        if slots.remove(key).is_some() {
            self.persist(&slots).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut slots = self.slots.write().await;
        slots.clear();
        self.persist(&slots).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.slots.read().await.keys().cloned().collect())
    }
}
