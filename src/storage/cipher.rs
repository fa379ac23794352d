//! Passphrase-based symmetric encryption for stored secrets
//!
//! AES-256-GCM with a fresh 96-bit nonce per write. The key is derived once
//! from the passphrase with Argon2. A sealed value is base64 of a small JSON
//! envelope so the format can evolve.

use crate::error::{Error, Result};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

const ENVELOPE_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;

/// Fixed KDF salt; the passphrase is the only secret input
const KDF_SALT: &[u8] = b"sessionguard/secure-storage/v1";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u8,
    nonce: String,
    ct: String,
}

/// Encrypts and decrypts slot values under one passphrase
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SecretCipher {
    /// Derive the cipher key from a passphrase
    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(Error::storage("Encryption passphrase must not be empty"));
        }

        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), KDF_SALT, &mut key)
            .map_err(|e| Error::storage(format!("Key derivation failed: {e}")))?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| Error::storage(format!("Failed to create encryption cipher: {e}")))?;

        Ok(Self { cipher })
    }

    /// Encrypt a plaintext into a sealed string
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| Error::storage(format!("Encryption failed: {e}")))?;

        let envelope = Envelope {
            v: ENVELOPE_VERSION,
            nonce: BASE64.encode(nonce),
            ct: BASE64.encode(ciphertext),
        };
        let serialized = serde_json::to_vec(&envelope)
            .map_err(|e| Error::storage(format!("Failed to serialize envelope: {e}")))?;
        Ok(BASE64.encode(serialized))
    }

    /// Decrypt a sealed string back into its plaintext
    pub fn open(&self, sealed: &str) -> Result<String> {
        let decoded = BASE64
            .decode(sealed.trim())
            .map_err(|e| Error::storage(format!("Base64 decode failed: {e}")))?;
        let envelope: Envelope = serde_json::from_slice(&decoded)
            .map_err(|e| Error::storage(format!("Malformed envelope: {e}")))?;

        if envelope.v != ENVELOPE_VERSION {
            return Err(Error::storage(format!(
                "Unsupported envelope version: {}",
                envelope.v
            )));
        }

        let nonce_bytes = BASE64
            .decode(&envelope.nonce)
            .map_err(|e| Error::storage(format!("Base64 decode failed: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(Error::storage("Invalid nonce length"));
        }
        let ciphertext = BASE64
            .decode(&envelope.ct)
            .map_err(|e| Error::storage(format!("Base64 decode failed: {e}")))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| Error::storage(format!("Decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| Error::storage(format!("Decrypted value is not UTF-8: {e}")))
    }
}
