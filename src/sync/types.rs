//! Coordinator options and the reports returned by its operations.

use crate::config::SyncConfig;
use crate::error::RemoteStoreError;
use crate::merge::Side;
use crate::types::SyncKey;

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SyncCoordinatorOptions {
    /// Keys this coordinator synchronizes (default: all sixteen).
    pub keys: Vec<SyncKey>,
    /// When false, `start_sync()` reports unavailable without contacting the
    /// remote store.
    pub enabled: bool,
    /// Capacity of the command channel (default: 64).
    pub mailbox_capacity: usize,
}

impl Default for SyncCoordinatorOptions {
    fn default() -> Self {
        Self {
            keys: SyncKey::ALL.to_vec(),
            enabled: true,
            mailbox_capacity: 64,
        }
    }
}

impl From<&SyncConfig> for SyncCoordinatorOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            keys: config.keys.clone(),
            enabled: config.enabled,
            mailbox_capacity: config.mailbox_capacity.max(1),
        }
    }
}

// ============================================================================
// Status and reports
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Subscribed to remote-change notifications.
    pub observing: bool,
    /// The remote store is usable for this session.
    pub available: bool,
}

/// A per-key failure absorbed during an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFailure {
    pub key: SyncKey,
    pub error: String,
}

/// Outcome of one download-and-merge pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// False when the pass was refused (sync unavailable).
    pub ran: bool,
    /// Keys whose local value was rewritten.
    pub changed: Vec<SyncKey>,
    /// Blobs that failed to decode and were treated as empty.
    pub undecodable: Vec<(SyncKey, Side)>,
    /// Keys whose local read or write failed; they were left untouched.
    pub failures: Vec<KeyFailure>,
    /// Whether `SyncEvent::Completed` was emitted for this pass.
    pub signaled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Sync is not available for this session.
    Unavailable,
    /// The key is not in this coordinator's key list.
    NotSynchronized,
    /// The local store has no value for the key.
    NoLocalValue,
}

/// Outcome of `upload_key` / `upload_all`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    pub uploaded: Vec<SyncKey>,
    pub skipped: Vec<(SyncKey, SkipReason)>,
    pub failures: Vec<KeyFailure>,
    /// Set when the closing `synchronize()` failed.
    pub flush_error: Option<RemoteStoreError>,
}
