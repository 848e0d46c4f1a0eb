use inkpad::credential::CredentialStore;
use serde_json::Value;
use tempfile::TempDir;

/// On-disk key of the persisted token (serde name of `PersistedCredential::token`).
const CREDENTIAL_KEY: &str = "token";

/// A credential survives reopening the store.
#[test]
fn test_credential_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("credentials.json");

    let store = CredentialStore::open(&path).unwrap();
    assert!(store.get().is_none());
    store.set("tok-1").unwrap();

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[CREDENTIAL_KEY], "tok-1");

    let reopened = CredentialStore::open(&path).unwrap();
    assert_eq!(reopened.get().unwrap().expose(), "tok-1");
}

/// Clearing removes the file; a second clear is harmless.
#[test]
fn test_clear_removes_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("credentials.json");

    let store = CredentialStore::open(&path).unwrap();
    store.set("tok-1").unwrap();
    store.clear().unwrap();
    assert!(!path.exists());
    store.clear().unwrap();

    let reopened = CredentialStore::open(&path).unwrap();
    assert!(!reopened.is_present());
}

/// A corrupt file is reported, not silently treated as signed out.
#[test]
fn test_corrupt_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("credentials.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(CredentialStore::open(&path).is_err());
}
