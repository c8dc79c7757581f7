//! Typed access to the collection keys for the collaborators that produce
//! entries.
//!
//! Each mutation is one [`LocalRecordStore::update`] call, so it cannot
//! interleave with a coordinator merge of the same key. After a mutation the
//! caller asks the coordinator to upload `E::KEY`.

use crate::codec::{decode_entries, encode_entries};
use crate::error::{Result, SyncError};
use crate::merge::{normalize, CollectionEntry, EntryOrder, MergeStrategy};
use crate::storage::LocalRecordStore;
use crate::types::{Favorite, NetworkProfile, SyncKey, TimestampMs};

/// Read a collection. A missing key is an empty collection; a corrupt blob is
/// an error.
pub fn load<E: CollectionEntry>(store: &dyn LocalRecordStore) -> Result<Vec<E>> {
    match store.get(E::KEY.as_str())? {
        Some(blob) => Ok(decode_entries(E::KEY, &blob)?),
        None => Ok(Vec::new()),
    }
}

/// Add `entry` to its collection and return the stored result.
///
/// - newest-first histories replace an entry with the same timestamp,
/// - favorites ignore a value that is already present, and a full list
///   ignores new values,
/// - network profiles replace the entry with the same ssid.
///
/// A corrupt stored blob is replaced rather than blocking the append. An
/// entry with a NaN or infinite measurement is rejected with
/// [`SyncError::NonFinite`] and the stored collection is left as it was.
pub fn append<E: CollectionEntry>(store: &dyn LocalRecordStore, entry: E) -> Result<Vec<E>> {
    modify::<E>(store, |entries| insert(entries, entry))
}

/// Remove every stored entry of `key`.
pub fn clear(store: &dyn LocalRecordStore, key: SyncKey) -> Result<()> {
    Ok(store.remove(key.as_str())?)
}

/// Remove the favorite whose value is `value`. Returns whether one existed.
pub fn remove_favorite(store: &dyn LocalRecordStore, value: &str) -> Result<bool> {
    let mut removed = false;
    modify::<Favorite>(store, |entries| {
        let before = entries.len();
        entries.retain(|f| f.value != value);
        removed = entries.len() != before;
    })?;
    Ok(removed)
}

/// Fold a measurement into the profile for `ssid`, creating it if needed.
/// A non-finite measurement is rejected and nothing is written.
pub fn record_network_sample(
    store: &dyn LocalRecordStore,
    ssid: &str,
    download: Option<f64>,
    upload: Option<f64>,
    latency: Option<f64>,
    at: TimestampMs,
) -> Result<NetworkProfile> {
    let mut updated = None;
    modify::<NetworkProfile>(store, |entries| {
        let mut profile = entries
            .iter()
            .find(|p| p.ssid == ssid)
            .cloned()
            .unwrap_or_else(|| NetworkProfile::new(ssid, at));
        profile.record_sample(download, upload, latency, at);
        updated = Some(profile.clone());
        insert(entries, profile);
    })?;
    Ok(updated.unwrap_or_else(|| NetworkProfile::new(ssid, at)))
}

fn insert<E: CollectionEntry>(entries: &mut Vec<E>, entry: E) {
    let key = entry.dedup_key();
    match E::STRATEGY {
        MergeStrategy::AppendDedupCapped {
            order: EntryOrder::AppendOrder,
            ..
        } => {
            if !entries.iter().any(|e| e.dedup_key() == key) {
                entries.push(entry);
            }
        }
        MergeStrategy::AppendDedupCapped { .. } | MergeStrategy::MergeLatestByKey { .. } => {
            entries.retain(|e| e.dedup_key() != key);
            entries.insert(0, entry);
        }
        MergeStrategy::ScalarOverwrite => {}
    }
}

/// Decode, apply `f`, normalize and write back under one store update.
fn modify<E: CollectionEntry>(
    store: &dyn LocalRecordStore,
    f: impl FnOnce(&mut Vec<E>),
) -> Result<Vec<E>> {
    let mut f = Some(f);
    let mut result: Option<Result<Vec<E>>> = None;

    store.update(E::KEY.as_str(), &mut |current| {
        let mut entries: Vec<E> = match current.map(|blob| decode_entries(E::KEY, blob)) {
            Some(Ok(entries)) => entries,
            Some(Err(e)) => {
                tracing::warn!(key = %E::KEY, error = %e.source, "replacing undecodable local collection");
                Vec::new()
            }
            None => Vec::new(),
        };
        if let Some(f) = f.take() {
            f(&mut entries);
        }
        if let Some(field) = entries.iter().find_map(|e| e.non_finite_field()) {
            result = Some(Err(SyncError::NonFinite {
                key: E::KEY.to_string(),
                field,
            }));
            return None;
        }
        let entries = normalize(entries);
        match encode_entries(E::KEY, &entries) {
            Ok(blob) => {
                result = Some(Ok(entries));
                Some(blob)
            }
            Err(e) => {
                result = Some(Err(e.into()));
                None
            }
        }
    })?;

    result.unwrap_or_else(|| Ok(Vec::new()))
}
