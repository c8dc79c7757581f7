//! SqliteRecordStore, in-memory and on disk.

use netpulse_sync::config::SyncConfig;
use netpulse_sync::error::StorageError;
use netpulse_sync::storage::{open_configured, LocalRecordStore, SqliteRecordStore};

fn make_store() -> SqliteRecordStore {
    let mut store = SqliteRecordStore::open_in_memory().expect("open in-memory DB");
    store.initialize().expect("initialize");
    store
}

#[test]
fn operations_before_initialize_fail() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    assert!(!store.is_initialized());
    assert!(matches!(store.get("k"), Err(StorageError::NotInitialized)));
    assert!(matches!(store.set("k", b"v"), Err(StorageError::NotInitialized)));
    assert!(matches!(
        store.update("k", &mut |_| None),
        Err(StorageError::NotInitialized)
    ));
}

#[test]
fn initialize_twice_is_harmless() {
    let mut store = make_store();
    store.set("k", b"v").unwrap();
    store.initialize().unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"v"[..]));
}

#[test]
fn set_overwrites() {
    let store = make_store();
    store.set("Favorites", b"[]").unwrap();
    store.set("Favorites", b"[1]").unwrap();
    assert_eq!(store.get("Favorites").unwrap().as_deref(), Some(&b"[1]"[..]));
}

#[test]
fn remove_missing_key_is_ok() {
    let store = make_store();
    store.remove("nothing-here").unwrap();
    assert_eq!(store.get("nothing-here").unwrap(), None);
}

#[test]
fn update_reads_and_writes_in_one_step() {
    let store = make_store();

    let first = store
        .update("counter", &mut |current| {
            assert!(current.is_none());
            Some(vec![1])
        })
        .unwrap();
    let second = store
        .update("counter", &mut |current| {
            let n = current.map(|b| b[0]).unwrap_or(0);
            Some(vec![n + 1])
        })
        .unwrap();
    let third = store.update("counter", &mut |_| None).unwrap();

    assert!(first && second && !third);
    assert_eq!(store.get("counter").unwrap(), Some(vec![2]));
}

#[test]
fn values_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync.db");

    {
        let mut store = SqliteRecordStore::open(&path).unwrap();
        store.initialize().unwrap();
        store.set("NetworkProfiles", br#"[{"ssid":"Home"}]"#).unwrap();
    }

    let mut store = SqliteRecordStore::open(&path).unwrap();
    store.initialize().unwrap();
    assert_eq!(
        store.get("NetworkProfiles").unwrap().as_deref(),
        Some(&br#"[{"ssid":"Home"}]"#[..])
    );
}

#[test]
fn configured_path_opens_initialized_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        local_store_path: Some(dir.path().join("configured.db")),
        ..Default::default()
    };

    {
        let store = open_configured(&config).unwrap();
        store.set("Favorites", b"[]").unwrap();
    }

    let reopened = open_configured(&config).unwrap();
    assert_eq!(reopened.get("Favorites").unwrap().as_deref(), Some(&b"[]"[..]));
    assert!(dir.path().join("configured.db").exists());
}
