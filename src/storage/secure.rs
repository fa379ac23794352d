//! Encrypted credential store

use super::backend::{KeyValueBackend, MemoryBackend};
use super::cipher::SecretCipher;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What `get` does with a slot that cannot be decrypted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionPolicy {
    /// Report the slot as absent, same as a slot that was never set
    #[default]
    TreatAsAbsent,
    /// Return `Error::CorruptedSecret`
    Error,
}

/// Key-value store that encrypts values before they reach the backend
pub struct SecureStorage {
    backend: Arc<dyn KeyValueBackend>,
    cipher: SecretCipher,
    policy: CorruptionPolicy,
}

impl SecureStorage {
    /// Create a store over a backend, encrypting under `passphrase`
    pub fn new(backend: Arc<dyn KeyValueBackend>, passphrase: &str) -> Result<Self> {
        Ok(Self {
            backend,
            cipher: SecretCipher::from_passphrase(passphrase)?,
            policy: CorruptionPolicy::default(),
        })
    }

    /// Create a store over a fresh in-memory backend
    pub fn in_memory(passphrase: &str) -> Result<Self> {
        Self::new(Arc::new(MemoryBackend::new()), passphrase)
    }

    /// Set the policy for undecryptable slots
    #[must_use]
    pub fn with_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CorruptionPolicy {
        self.policy
    }

    /// The raw backend (ciphertext only)
    pub fn backend(&self) -> &Arc<dyn KeyValueBackend> {
        &self.backend
    }

    /// Encrypt and store a value
    pub async fn put(&self, key: &str, plaintext: &str) -> Result<()> {
        let sealed = self.cipher.seal(plaintext)?;
        self.backend.write(key, sealed).await
    }

    /// Read and decrypt a value; `None` when the slot is absent
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(sealed) = self.backend.read(key).await? else {
            return Ok(None);
        };

        match self.cipher.open(&sealed) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            Ok(_) => {
                debug!(key, "Stored secret decrypted to an empty value");
                self.corrupted(key)
            }
            Err(e) => {
                debug!(key, "Failed to decrypt stored secret: {e}");
                self.corrupted(key)
            }
        }
    }

    /// Remove a value
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await
    }

    /// Whether the slot exists (without decrypting it)
    pub async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.backend.read(key).await?.is_some())
    }

    /// Remove every slot
    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    fn corrupted(&self, key: &str) -> Result<Option<String>> {
        match self.policy {
            CorruptionPolicy::TreatAsAbsent => Ok(None),
            CorruptionPolicy::Error => Err(Error::CorruptedSecret {
                key: key.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for SecureStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStorage")
            .field("cipher", &self.cipher)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
