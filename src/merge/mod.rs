//! Per-key merge strategies.
//!
//! # Overview
//!
//! Every [`SyncKey`] maps to exactly one [`MergeStrategy`]. Scalar keys use
//! [`MergeStrategy::ScalarOverwrite`]; each collection key is bound to an
//! entry type implementing [`CollectionEntry`], which carries its dedup key,
//! recency key and strategy. [`merge_blobs`] is the single entry point used by
//! the coordinator: it decodes both sides, runs the generic algorithm from
//! [`policy`], and reports whether the local value changed.
//!
//! Merging never fails. A side that is missing or cannot be decoded is
//! treated as an empty collection (or as absent, for scalars) and reported in
//! [`Merged::undecodable`].

pub mod policy;

use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{decode_entries, encode_entries};
use crate::types::{
    Blob, Favorite, NetworkProfile, QualitySample, SpeedTestResult, SyncKey, TimestampMs,
};

pub use policy::{append_dedup_capped, merge_latest_by_key, EntryOrder};

pub const SPEED_TEST_HISTORY_CAP: usize = 50;
pub const QUALITY_HISTORY_CAP: usize = 2880;
pub const FAVORITES_CAP: usize = 20;
pub const NETWORK_PROFILES_CAP: usize = 30;

// ============================================================================
// Strategy table
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// `remote ?? local`.
    ScalarOverwrite,
    /// Local first, remote entries appended when their dedup key is new.
    AppendDedupCapped { cap: usize, order: EntryOrder },
    /// Union by dedup key, most recent entry wins, newest first.
    MergeLatestByKey { cap: usize },
}

/// An element of a synchronized collection.
pub trait CollectionEntry: Serialize + DeserializeOwned + Clone + PartialEq {
    type DedupKey: Eq + Hash;

    /// The collection key this entry type is stored under.
    const KEY: SyncKey;
    const STRATEGY: MergeStrategy;

    fn dedup_key(&self) -> Self::DedupKey;

    /// Ordering key for newest-first collections. Unused for append order.
    fn recency(&self) -> TimestampMs {
        0
    }

    /// Name of the first floating-point field holding NaN or infinity.
    fn non_finite_field(&self) -> Option<&'static str> {
        None
    }
}

fn first_non_finite(fields: &[(&'static str, Option<f64>)]) -> Option<&'static str> {
    fields
        .iter()
        .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        .map(|(name, _)| *name)
}

impl CollectionEntry for SpeedTestResult {
    type DedupKey = TimestampMs;
    const KEY: SyncKey = SyncKey::SpeedTestHistory;
    const STRATEGY: MergeStrategy = MergeStrategy::AppendDedupCapped {
        cap: SPEED_TEST_HISTORY_CAP,
        order: EntryOrder::NewestFirst,
    };

    fn dedup_key(&self) -> TimestampMs {
        self.timestamp
    }

    fn recency(&self) -> TimestampMs {
        self.timestamp
    }

    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("downloadMbps", Some(self.download_mbps)),
            ("uploadMbps", Some(self.upload_mbps)),
            ("latencyMs", Some(self.latency_ms)),
        ])
    }
}

impl CollectionEntry for QualitySample {
    type DedupKey = TimestampMs;
    const KEY: SyncKey = SyncKey::QualityHistory;
    const STRATEGY: MergeStrategy = MergeStrategy::AppendDedupCapped {
        cap: QUALITY_HISTORY_CAP,
        order: EntryOrder::NewestFirst,
    };

    fn dedup_key(&self) -> TimestampMs {
        self.timestamp
    }

    fn recency(&self) -> TimestampMs {
        self.timestamp
    }

    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("latencyMs", Some(self.latency_ms)),
            ("jitterMs", Some(self.jitter_ms)),
            ("packetLossPct", Some(self.packet_loss_pct)),
        ])
    }
}

impl CollectionEntry for Favorite {
    type DedupKey = String;
    const KEY: SyncKey = SyncKey::Favorites;
    const STRATEGY: MergeStrategy = MergeStrategy::AppendDedupCapped {
        cap: FAVORITES_CAP,
        order: EntryOrder::AppendOrder,
    };

    fn dedup_key(&self) -> String {
        self.value.clone()
    }
}

impl CollectionEntry for NetworkProfile {
    type DedupKey = String;
    const KEY: SyncKey = SyncKey::NetworkProfiles;
    const STRATEGY: MergeStrategy = MergeStrategy::MergeLatestByKey {
        cap: NETWORK_PROFILES_CAP,
    };

    fn dedup_key(&self) -> String {
        self.ssid.clone()
    }

    fn recency(&self) -> TimestampMs {
        self.last_seen_timestamp
    }

    fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite(&[
            ("avgDownload", self.avg_download),
            ("avgUpload", self.avg_upload),
            ("avgLatency", self.avg_latency),
        ])
    }
}

/// The strategy used for `key`.
pub fn strategy_for(key: SyncKey) -> MergeStrategy {
    match key {
        SyncKey::SpeedTestHistory => SpeedTestResult::STRATEGY,
        SyncKey::QualityHistory => QualitySample::STRATEGY,
        SyncKey::Favorites => Favorite::STRATEGY,
        SyncKey::NetworkProfiles => NetworkProfile::STRATEGY,
        _ => MergeStrategy::ScalarOverwrite,
    }
}

// ============================================================================
// Typed merge
// ============================================================================

/// Merge two decoded collections with `E`'s strategy.
pub fn merge_entries<E: CollectionEntry>(local: Vec<E>, remote: Vec<E>) -> Vec<E> {
    match E::STRATEGY {
        MergeStrategy::AppendDedupCapped { cap, order } => append_dedup_capped(
            local,
            remote,
            E::dedup_key,
            E::recency,
            order,
            cap,
        ),
        MergeStrategy::MergeLatestByKey { cap } => {
            merge_latest_by_key(local, remote, E::dedup_key, E::recency, cap)
        }
        // Collections are never bound to the scalar policy; keep local intact.
        MergeStrategy::ScalarOverwrite => local,
    }
}

/// Put a locally-built collection into canonical form: deduplicated, ordered
/// and capped, exactly as a merge with an empty remote would leave it.
pub fn normalize<E: CollectionEntry>(entries: Vec<E>) -> Vec<E> {
    merge_entries(entries, Vec::new())
}

// ============================================================================
// Blob merge
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

/// Result of merging one key.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    /// The value the local store should hold afterwards. `None` when neither
    /// side had a value.
    pub value: Option<Blob>,
    /// Whether `value` differs from what the local store held.
    pub changed: bool,
    /// Sides that were present but failed to decode.
    pub undecodable: Vec<Side>,
}

impl Merged {
    fn unchanged(local: Option<&[u8]>, undecodable: Vec<Side>) -> Self {
        Self {
            value: local.map(<[u8]>::to_vec),
            changed: false,
            undecodable,
        }
    }
}

/// Merge the local and remote blobs for `key`.
pub fn merge_blobs(key: SyncKey, local: Option<&[u8]>, remote: Option<&[u8]>) -> Merged {
    match key {
        SyncKey::SpeedTestHistory => merge_collection::<SpeedTestResult>(local, remote),
        SyncKey::QualityHistory => merge_collection::<QualitySample>(local, remote),
        SyncKey::Favorites => merge_collection::<Favorite>(local, remote),
        SyncKey::NetworkProfiles => merge_collection::<NetworkProfile>(local, remote),
        _ => scalar_overwrite(local, remote),
    }
}

fn scalar_overwrite(local: Option<&[u8]>, remote: Option<&[u8]>) -> Merged {
    match remote {
        Some(remote) => Merged {
            value: Some(remote.to_vec()),
            changed: local != Some(remote),
            undecodable: Vec::new(),
        },
        None => Merged::unchanged(local, Vec::new()),
    }
}

fn merge_collection<E: CollectionEntry>(local: Option<&[u8]>, remote: Option<&[u8]>) -> Merged {
    let mut undecodable = Vec::new();
    let local_entries = decode_side::<E>(local, Side::Local, &mut undecodable);
    let remote_entries = decode_side::<E>(remote, Side::Remote, &mut undecodable);

    let Some(local_entries) = local_entries else {
        // Nothing usable locally: adopt whatever the remote side contributes.
        let merged = merge_entries(Vec::new(), remote_entries.unwrap_or_default());
        if merged.is_empty() {
            return Merged::unchanged(local, undecodable);
        }
        return encode_merged(local, merged, undecodable);
    };

    let merged = merge_entries(local_entries.clone(), remote_entries.unwrap_or_default());
    if merged == local_entries {
        return Merged::unchanged(local, undecodable);
    }
    encode_merged(local, merged, undecodable)
}

fn decode_side<E: CollectionEntry>(
    blob: Option<&[u8]>,
    side: Side,
    undecodable: &mut Vec<Side>,
) -> Option<Vec<E>> {
    let blob = blob?;
    match decode_entries::<E>(E::KEY, blob) {
        Ok(entries) => Some(entries),
        Err(e) => {
            tracing::warn!(key = %E::KEY, ?side, error = %e.source, "undecodable blob, treating as empty");
            undecodable.push(side);
            None
        }
    }
}

fn encode_merged<E: CollectionEntry>(
    local: Option<&[u8]>,
    merged: Vec<E>,
    undecodable: Vec<Side>,
) -> Merged {
    match encode_entries(E::KEY, &merged) {
        Ok(blob) => Merged {
            value: Some(blob),
            changed: true,
            undecodable,
        },
        Err(e) => {
            tracing::warn!(key = %E::KEY, error = %e.source, "failed to encode merged collection");
            Merged::unchanged(local, undecodable)
        }
    }
}
