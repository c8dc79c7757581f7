use netpulse_sync::collections;
use netpulse_sync::error::SyncError;
use netpulse_sync::merge::NETWORK_PROFILES_CAP;
use netpulse_sync::storage::MemoryRecordStore;
use netpulse_sync::types::NetworkProfile;

#[test]
fn first_sample_creates_profile() {
    let store = MemoryRecordStore::new();

    let profile =
        collections::record_network_sample(&store, "Home", Some(100.0), Some(20.0), Some(15.0), 1_000)
            .unwrap();

    assert_eq!(profile.ssid, "Home");
    assert_eq!(profile.sample_count, 1);
    assert_eq!(profile.avg_download, Some(100.0));
    assert_eq!(profile.last_seen_timestamp, 1_000);
}

#[test]
fn later_samples_fold_into_averages() {
    let store = MemoryRecordStore::new();
    collections::record_network_sample(&store, "Home", Some(100.0), None, Some(10.0), 1_000).unwrap();
    let profile =
        collections::record_network_sample(&store, "Home", Some(200.0), None, None, 2_000).unwrap();

    assert_eq!(profile.sample_count, 2);
    assert_eq!(profile.avg_download, Some(150.0));
    assert_eq!(profile.avg_upload, None);
    assert_eq!(profile.avg_latency, Some(10.0));
    assert_eq!(profile.last_seen_timestamp, 2_000);

    let stored: Vec<NetworkProfile> = collections::load(&store).unwrap();
    assert_eq!(stored, vec![profile]);
}

#[test]
fn upserted_profile_moves_to_front() {
    let store = MemoryRecordStore::new();
    collections::append(&store, NetworkProfile::new("Office", 10)).unwrap();
    collections::append(&store, NetworkProfile::new("Home", 20)).unwrap();

    let entries = collections::append(&store, NetworkProfile::new("Office", 30)).unwrap();

    let ssids: Vec<_> = entries.iter().map(|p| p.ssid.as_str()).collect();
    assert_eq!(ssids, vec!["Office", "Home"]);
}

#[test]
fn least_recently_seen_profile_is_evicted() {
    let store = MemoryRecordStore::new();
    for i in 0..=NETWORK_PROFILES_CAP as i64 {
        collections::append(&store, NetworkProfile::new(format!("net-{i}"), i)).unwrap();
    }

    let entries: Vec<NetworkProfile> = collections::load(&store).unwrap();
    assert_eq!(entries.len(), NETWORK_PROFILES_CAP);
    assert!(entries.iter().all(|p| p.ssid != "net-0"));
}

#[test]
fn nan_sample_leaves_profiles_untouched() {
    let store = MemoryRecordStore::new();
    collections::record_network_sample(&store, "Home", Some(100.0), None, None, 1_000).unwrap();
    collections::record_network_sample(&store, "Office", Some(50.0), None, None, 2_000).unwrap();
    let before: Vec<NetworkProfile> = collections::load(&store).unwrap();

    let err =
        collections::record_network_sample(&store, "Home", Some(f64::NAN), None, None, 3_000)
            .unwrap_err();

    assert!(matches!(err, SyncError::NonFinite { field: "avgDownload", .. }));
    let after: Vec<NetworkProfile> = collections::load(&store).unwrap();
    assert_eq!(after, before);
}

#[test]
fn nan_sample_for_new_network_is_not_stored() {
    let store = MemoryRecordStore::new();
    collections::record_network_sample(&store, "Home", Some(100.0), None, None, 1_000).unwrap();

    let result =
        collections::record_network_sample(&store, "Cafe", None, None, Some(f64::NAN), 2_000);

    assert!(matches!(result, Err(SyncError::NonFinite { field: "avgLatency", .. })));
    let stored: Vec<NetworkProfile> = collections::load(&store).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ssid, "Home");
}
