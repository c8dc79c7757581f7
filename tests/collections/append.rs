//! Collaborator-side writes to the collection keys.

use netpulse_sync::collections;
use netpulse_sync::error::SyncError;
use netpulse_sync::merge::{FAVORITES_CAP, SPEED_TEST_HISTORY_CAP};
use netpulse_sync::storage::{LocalRecordStore, MemoryRecordStore};
use netpulse_sync::types::{Favorite, FavoriteKind, QualitySample, SpeedTestResult, SyncKey};

fn speed(timestamp: i64, download: f64) -> SpeedTestResult {
    SpeedTestResult {
        timestamp,
        download_mbps: download,
        upload_mbps: 5.0,
        latency_ms: 30.0,
        location: Some("Lab".into()),
    }
}

fn favorite(value: &str, label: Option<&str>) -> Favorite {
    Favorite {
        kind: FavoriteKind::DnsLookup,
        value: value.to_string(),
        label: label.map(str::to_string),
    }
}

#[test]
fn load_of_missing_key_is_empty() {
    let store = MemoryRecordStore::new();
    let entries: Vec<SpeedTestResult> = collections::load(&store).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn load_of_corrupt_blob_is_an_error() {
    let store = MemoryRecordStore::new();
    store.set("SpeedTestHistory", b"nope").unwrap();
    let result = collections::load::<SpeedTestResult>(&store);
    assert!(matches!(result, Err(SyncError::Codec(_))));
}

#[test]
fn history_append_is_newest_first() {
    let store = MemoryRecordStore::new();
    collections::append(&store, speed(1, 10.0)).unwrap();
    collections::append(&store, speed(3, 30.0)).unwrap();
    let entries = collections::append(&store, speed(2, 20.0)).unwrap();

    let stamps: Vec<_> = entries.iter().map(|e| e.timestamp).collect();
    assert_eq!(stamps, vec![3, 2, 1]);
    assert_eq!(collections::load::<SpeedTestResult>(&store).unwrap(), entries);
}

#[test]
fn history_append_replaces_same_timestamp() {
    let store = MemoryRecordStore::new();
    collections::append(&store, speed(7, 10.0)).unwrap();
    let entries = collections::append(&store, speed(7, 99.0)).unwrap();

    assert_eq!(entries, vec![speed(7, 99.0)]);
}

#[test]
fn history_append_drops_oldest_beyond_cap() {
    let store = MemoryRecordStore::new();
    for t in 0..(SPEED_TEST_HISTORY_CAP as i64 + 5) {
        collections::append(&store, speed(t, 1.0)).unwrap();
    }
    let entries: Vec<SpeedTestResult> = collections::load(&store).unwrap();
    assert_eq!(entries.len(), SPEED_TEST_HISTORY_CAP);
    assert_eq!(entries.last().unwrap().timestamp, 5);
}

#[test]
fn duplicate_favorite_is_ignored() {
    let store = MemoryRecordStore::new();
    collections::append(&store, favorite("example.com", Some("first"))).unwrap();
    let entries = collections::append(&store, favorite("example.com", Some("second"))).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].label.as_deref(), Some("first"));
}

#[test]
fn full_favorites_list_ignores_new_values() {
    let store = MemoryRecordStore::new();
    for i in 0..FAVORITES_CAP {
        collections::append(&store, favorite(&format!("host-{i}"), None)).unwrap();
    }
    let entries = collections::append(&store, favorite("one-too-many", None)).unwrap();

    assert_eq!(entries.len(), FAVORITES_CAP);
    assert!(entries.iter().all(|f| f.value != "one-too-many"));
}

#[test]
fn remove_favorite_reports_whether_it_existed() {
    let store = MemoryRecordStore::new();
    collections::append(&store, favorite("a", None)).unwrap();
    collections::append(&store, favorite("b", None)).unwrap();

    assert!(collections::remove_favorite(&store, "a").unwrap());
    assert!(!collections::remove_favorite(&store, "a").unwrap());

    let remaining: Vec<Favorite> = collections::load(&store).unwrap();
    assert_eq!(remaining, vec![favorite("b", None)]);
}

#[test]
fn append_replaces_corrupt_blob() {
    let store = MemoryRecordStore::new();
    store.set("Favorites", b"{{{{").unwrap();

    let entries = collections::append(&store, favorite("a", None)).unwrap();

    assert_eq!(entries, vec![favorite("a", None)]);
    assert_eq!(collections::load::<Favorite>(&store).unwrap(), entries);
}

#[test]
fn clear_removes_the_key() {
    let store = MemoryRecordStore::new();
    collections::append(&store, speed(1, 1.0)).unwrap();

    collections::clear(&store, SyncKey::SpeedTestHistory).unwrap();

    assert_eq!(store.get("SpeedTestHistory").unwrap(), None);
}

fn quality(timestamp: i64, packet_loss_pct: f64) -> QualitySample {
    QualitySample {
        timestamp,
        latency_ms: 18.0,
        jitter_ms: 2.0,
        packet_loss_pct,
    }
}

#[test]
fn nan_sample_is_rejected_and_history_survives() {
    let store = MemoryRecordStore::new();
    collections::append(&store, quality(1, 0.0)).unwrap();
    collections::append(&store, quality(2, 0.5)).unwrap();

    let err = collections::append(&store, quality(3, f64::NAN)).unwrap_err();
    assert!(matches!(
        err,
        SyncError::NonFinite { ref key, field: "packetLossPct" } if key == "QualityHistory"
    ));

    let stored: Vec<QualitySample> = collections::load(&store).unwrap();
    let stamps: Vec<_> = stored.iter().map(|q| q.timestamp).collect();
    assert_eq!(stamps, vec![2, 1]);

    let entries = collections::append(&store, quality(4, 0.0)).unwrap();
    assert_eq!(entries.len(), 3);
}

#[test]
fn infinite_speed_is_rejected() {
    let store = MemoryRecordStore::new();
    collections::append(&store, speed(1, 10.0)).unwrap();

    let err = collections::append(&store, speed(2, f64::INFINITY)).unwrap_err();

    assert!(matches!(err, SyncError::NonFinite { field: "downloadMbps", .. }));
    assert_eq!(
        collections::load::<SpeedTestResult>(&store).unwrap(),
        vec![speed(1, 10.0)]
    );
}
