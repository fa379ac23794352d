//! Tests for the storage module

use super::*;
use crate::error::Error;
use std::sync::Arc;
use tempfile::tempdir;

const PASSPHRASE: &str = "test-passphrase";

// ============================================================================
// SecureStorage Tests
// ============================================================================

#[tokio::test]
async fn test_put_get() {
    let store = SecureStorage::in_memory(PASSPHRASE).unwrap();

    store.put("k", "secret").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some("secret".to_string()));
}

#[tokio::test]
async fn test_get_unset_is_absent() {
    let store = SecureStorage::in_memory(PASSPHRASE).unwrap();
    assert_eq!(store.get("unset").await.unwrap(), None);
    assert!(!store.has("unset").await.unwrap());
}

#[tokio::test]
async fn test_backend_never_holds_plaintext() {
    let store = SecureStorage::in_memory(PASSPHRASE).unwrap();
    store.put("api_admin_key", "sk_admin_abcdef").await.unwrap();

    let raw = store.backend().read("api_admin_key").await.unwrap().unwrap();
    assert!(!raw.contains("sk_admin_abcdef"));
}

#[tokio::test]
async fn test_corrupted_slot_is_absent() {
    let store = SecureStorage::in_memory(PASSPHRASE).unwrap();
    store.put("k", "secret").await.unwrap();

    store
        .backend()
        .write("k", "definitely-not-ciphertext".to_string())
        .await
        .unwrap();

    assert_eq!(store.get("k").await.unwrap(), None);
    // The slot is still there, it just cannot be read
    assert!(store.has("k").await.unwrap());
}

#[tokio::test]
async fn test_tampered_ciphertext_is_absent() {
    let store = SecureStorage::in_memory(PASSPHRASE).unwrap();
    store.put("k", "secret").await.unwrap();

    let raw = store.backend().read("k").await.unwrap().unwrap();
    let mut bytes = raw.into_bytes();
    let mid = bytes.len() / 2;
    bytes[mid] = if bytes[mid] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes).unwrap();
    store.backend().write("k", tampered).await.unwrap();

    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_corrupted_slot_errors_under_strict_policy() {
    let store = SecureStorage::in_memory(PASSPHRASE)
        .unwrap()
        .with_policy(CorruptionPolicy::Error);
    store.backend().write("k", "garbage".to_string()).await.unwrap();

    let err = store.get("k").await.unwrap_err();
    assert!(matches!(err, Error::CorruptedSecret { ref key } if key == "k"));

    // Absent slots are still absent, not errors
    assert_eq!(store.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_empty_value_reads_as_absent() {
    let store = SecureStorage::in_memory(PASSPHRASE).unwrap();
    store.put("k", "").await.unwrap();

    assert!(store.has("k").await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_passphrase_change_invalidates_values() {
    let backend: Arc<dyn KeyValueBackend> = Arc::new(MemoryBackend::new());

    let old = SecureStorage::new(backend.clone(), "old-passphrase").unwrap();
    old.put("token", "abc").await.unwrap();

    let new = SecureStorage::new(backend, "new-passphrase").unwrap();
    assert_eq!(new.get("token").await.unwrap(), None);
}

#[tokio::test]
async fn test_remove_and_clear() {
    let store = SecureStorage::in_memory(PASSPHRASE).unwrap();
    store.put("a", "1").await.unwrap();
    store.put("b", "2").await.unwrap();

    store.remove("a").await.unwrap();
    assert!(!store.has("a").await.unwrap());
    assert!(store.has("b").await.unwrap());

    // Removing a missing slot is fine
    store.remove("a").await.unwrap();

    store.clear().await.unwrap();
    assert!(!store.has("b").await.unwrap());
    assert!(store.backend().keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_overwrite_last_write_wins() {
    let store = SecureStorage::in_memory(PASSPHRASE).unwrap();
    store.put("k", "first").await.unwrap();
    store.put("k", "second").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some("second".to_string()));
}

#[test]
fn test_empty_passphrase_rejected() {
    let err = SecureStorage::in_memory("").unwrap_err();
    assert!(matches!(err, Error::Storage { .. }));
}

#[test]
fn test_corruption_policy_serde() {
    let policy: CorruptionPolicy = serde_json::from_str("\"error\"").unwrap();
    assert_eq!(policy, CorruptionPolicy::Error);
    assert_eq!(CorruptionPolicy::default(), CorruptionPolicy::TreatAsAbsent);
}

// ============================================================================
// FileBackend Tests
// ============================================================================

#[tokio::test]
async fn test_file_backend_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let backend = Arc::new(FileBackend::open(&path).await.unwrap());
        let store = SecureStorage::new(backend, PASSPHRASE).unwrap();
        store.put("session", "tok_1").await.unwrap();
    }

    let backend = Arc::new(FileBackend::open(&path).await.unwrap());
    let store = SecureStorage::new(backend, PASSPHRASE).unwrap();
    assert_eq!(store.get("session").await.unwrap(), Some("tok_1".to_string()));

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("tok_1"));
}

#[tokio::test]
async fn test_file_backend_creates_parent_dirs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("store.json");

    let backend = FileBackend::open(&path).await.unwrap();
    backend.write("k", "v".to_string()).await.unwrap();

    assert!(path.exists());
    assert_eq!(backend.path(), path.as_path());
}

#[tokio::test]
async fn test_file_backend_clear_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    let backend = FileBackend::open(&path).await.unwrap();
    backend.write("a", "1".to_string()).await.unwrap();
    backend.clear().await.unwrap();

    let reopened = FileBackend::open(&path).await.unwrap();
    assert!(reopened.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_backend_rejects_malformed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "not json").unwrap();

    let err = FileBackend::open(&path).await.unwrap_err();
    assert!(matches!(err, Error::Storage { .. }));
}

#[tokio::test]
async fn test_memory_backend_keys_sorted() {
    let backend = MemoryBackend::new();
    backend.write("b", "2".to_string()).await.unwrap();
    backend.write("a", "1".to_string()).await.unwrap();
    assert_eq!(backend.keys().await.unwrap(), vec!["a", "b"]);
}
