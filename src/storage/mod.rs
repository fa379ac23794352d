//! Encrypted credential storage
//!
//! `SecureStorage` puts a passphrase-derived AES-256-GCM layer in front of a
//! flat string key-value backend. Backends only ever hold ciphertext.
//!
//! Backends:
//! - `MemoryBackend`: process-local, for tests and ephemeral sessions
//! - `FileBackend`: JSON file, survives restarts until cleared

mod backend;
mod cipher;
mod secure;

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use cipher::SecretCipher;
pub use secure::{CorruptionPolicy, SecureStorage};

#[cfg(test)]
mod tests;
