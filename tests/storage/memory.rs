use netpulse_sync::storage::{LocalRecordStore, MemoryRecordStore};

#[test]
fn get_set_remove() {
    let store = MemoryRecordStore::new();
    assert!(store.is_empty());
    assert_eq!(store.get("GeekMode").unwrap(), None);

    store.set("GeekMode", b"true").unwrap();
    assert_eq!(store.get("GeekMode").unwrap().as_deref(), Some(&b"true"[..]));
    assert_eq!(store.len(), 1);

    store.remove("GeekMode").unwrap();
    assert_eq!(store.get("GeekMode").unwrap(), None);
}

#[test]
fn update_sees_current_value_and_writes_result() {
    let store = MemoryRecordStore::new();
    store.set("k", b"a").unwrap();

    let mut seen = None;
    let written = store
        .update("k", &mut |current| {
            seen = current.map(<[u8]>::to_vec);
            Some(b"ab".to_vec())
        })
        .unwrap();

    assert!(written);
    assert_eq!(seen.as_deref(), Some(&b"a"[..]));
    assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"ab"[..]));
}

#[test]
fn update_returning_none_leaves_value() {
    let store = MemoryRecordStore::new();
    store.set("k", b"a").unwrap();

    let written = store.update("k", &mut |_| None).unwrap();

    assert!(!written);
    assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"a"[..]));
}

#[test]
fn config_without_path_opens_memory_store() {
    let config = netpulse_sync::config::SyncConfig::default();
    let store = netpulse_sync::storage::open_configured(&config).unwrap();

    store.set("GeekMode", b"true").unwrap();
    assert_eq!(store.get("GeekMode").unwrap().as_deref(), Some(&b"true"[..]));
}
