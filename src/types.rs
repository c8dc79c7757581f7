//! Core data model: synchronized keys and the entry types carried by the
//! collection keys.
//!
//! Field names follow the camelCase wire format. Optional fields are skipped
//! when absent so that a missing value round-trips as missing rather than as
//! a default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Opaque stored value, as held by both the local and remote stores.
pub type Blob = Vec<u8>;

/// Unix timestamp in milliseconds.
pub type TimestampMs = i64;

// ============================================================================
// SyncKey
// ============================================================================

/// One synchronized unit. The string form is the storage key on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SyncKey {
    SpeedTestHistory,
    QualityHistory,
    Favorites,
    NetworkProfiles,
    CustomPingTarget,
    GeekMode,
    AppAppearance,
    MenuBarDisplayMode,
    NotifyConnectionChange,
    NotifyQualityDegradation,
    NotifyLatencyThreshold,
    NotifyLossThreshold,
    NotifySpeedTestComplete,
    ScheduledQualityTestEnabled,
    ScheduledQualityTestInterval,
    ScheduledDailyNotification,
}

/// Whether a key holds structured entries or a single settings value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Scalar,
    Collection,
}

impl SyncKey {
    /// The full synchronized key set, collections first.
    pub const ALL: [SyncKey; 16] = [
        SyncKey::SpeedTestHistory,
        SyncKey::QualityHistory,
        SyncKey::Favorites,
        SyncKey::NetworkProfiles,
        SyncKey::CustomPingTarget,
        SyncKey::GeekMode,
        SyncKey::AppAppearance,
        SyncKey::MenuBarDisplayMode,
        SyncKey::NotifyConnectionChange,
        SyncKey::NotifyQualityDegradation,
        SyncKey::NotifyLatencyThreshold,
        SyncKey::NotifyLossThreshold,
        SyncKey::NotifySpeedTestComplete,
        SyncKey::ScheduledQualityTestEnabled,
        SyncKey::ScheduledQualityTestInterval,
        SyncKey::ScheduledDailyNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpeedTestHistory => "SpeedTestHistory",
            Self::QualityHistory => "QualityHistory",
            Self::Favorites => "Favorites",
            Self::NetworkProfiles => "NetworkProfiles",
            Self::CustomPingTarget => "CustomPingTarget",
            Self::GeekMode => "GeekMode",
            Self::AppAppearance => "AppAppearance",
            Self::MenuBarDisplayMode => "MenuBarDisplayMode",
            Self::NotifyConnectionChange => "NotifyConnectionChange",
            Self::NotifyQualityDegradation => "NotifyQualityDegradation",
            Self::NotifyLatencyThreshold => "NotifyLatencyThreshold",
            Self::NotifyLossThreshold => "NotifyLossThreshold",
            Self::NotifySpeedTestComplete => "NotifySpeedTestComplete",
            Self::ScheduledQualityTestEnabled => "ScheduledQualityTestEnabled",
            Self::ScheduledQualityTestInterval => "ScheduledQualityTestInterval",
            Self::ScheduledDailyNotification => "ScheduledDailyNotification",
        }
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            Self::SpeedTestHistory
            | Self::QualityHistory
            | Self::Favorites
            | Self::NetworkProfiles => KeyKind::Collection,
            _ => KeyKind::Scalar,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.kind() == KeyKind::Collection
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SyncError::UnknownKey(s.to_string()))
    }
}

// ============================================================================
// Collection entries
// ============================================================================

/// One completed speed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTestResult {
    pub timestamp: TimestampMs,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub latency_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// One latency/jitter/loss sample from the connection-quality monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySample {
    pub timestamp: TimestampMs,
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub packet_loss_pct: f64,
}

/// What a favorite points at. Kinds written by newer clients decode as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FavoriteKind {
    PingTarget,
    DnsLookup,
    WhoisLookup,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub kind: FavoriteKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Aggregated measurements for one Wi-Fi network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub ssid: String,
    pub last_seen_timestamp: TimestampMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_download: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_upload: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_latency: Option<f64>,
    #[serde(default)]
    pub sample_count: u32,
}

impl NetworkProfile {
    pub fn new(ssid: impl Into<String>, seen_at: TimestampMs) -> Self {
        Self {
            ssid: ssid.into(),
            last_seen_timestamp: seen_at,
            avg_download: None,
            avg_upload: None,
            avg_latency: None,
            sample_count: 0,
        }
    }

    /// Fold one measurement into the running averages and mark the network
    /// as seen at `at`.
    ///
    /// A metric missing from the sample leaves its average untouched; an
    /// average that has never been set starts at the sample value.
    pub fn record_sample(
        &mut self,
        download: Option<f64>,
        upload: Option<f64>,
        latency: Option<f64>,
        at: TimestampMs,
    ) {
        let n = self.sample_count as f64;
        fold_average(&mut self.avg_download, download, n);
        fold_average(&mut self.avg_upload, upload, n);
        fold_average(&mut self.avg_latency, latency, n);
        self.sample_count = self.sample_count.saturating_add(1);
        self.last_seen_timestamp = self.last_seen_timestamp.max(at);
    }
}

fn fold_average(avg: &mut Option<f64>, sample: Option<f64>, prior_count: f64) {
    let Some(value) = sample else {
        return;
    };
    *avg = Some(match *avg {
        Some(current) if prior_count > 0.0 => (current * prior_count + value) / (prior_count + 1.0),
        _ => value,
    });
}
