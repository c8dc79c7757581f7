//! Scalar keys: the remote value wins whenever present.

use netpulse_sync::merge::{merge_blobs, strategy_for, MergeStrategy};
use netpulse_sync::types::SyncKey;

#[test]
fn remote_value_overwrites_local() {
    let result = merge_blobs(SyncKey::GeekMode, Some(b"false"), Some(b"true"));
    assert!(result.changed);
    assert_eq!(result.value.as_deref(), Some(&b"true"[..]));
}

#[test]
fn equal_values_are_not_a_change() {
    let result = merge_blobs(SyncKey::AppAppearance, Some(b"\"dark\""), Some(b"\"dark\""));
    assert!(!result.changed);
}

#[test]
fn missing_remote_keeps_local() {
    let result = merge_blobs(SyncKey::CustomPingTarget, Some(b"\"1.1.1.1\""), None);
    assert!(!result.changed);
    assert_eq!(result.value.as_deref(), Some(&b"\"1.1.1.1\""[..]));
}

#[test]
fn scalar_blobs_are_opaque() {
    // Not JSON; scalars are never decoded during a merge.
    let result = merge_blobs(SyncKey::NotifyLatencyThreshold, None, Some(b"\x01\x02"));
    assert!(result.changed);
    assert!(result.undecodable.is_empty());
}

#[test]
fn every_key_has_exactly_one_strategy() {
    for key in SyncKey::ALL {
        let strategy = strategy_for(key);
        assert_eq!(
            key.is_collection(),
            strategy != MergeStrategy::ScalarOverwrite,
            "{key}"
        );
    }
}
