//! Remote store seam: the eventually-consistent key-value store shared by all
//! of a user's devices.

pub mod memory;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::RemoteStoreError;
use crate::types::Blob;

pub use memory::{DeviceStore, SharedKvStore};

/// Why the remote store reported an external change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    /// Another device published new values.
    ServerChange,
    /// First download after this device attached to the account.
    InitialSync,
    /// A write from this device was rejected for exceeding the store's quota.
    QuotaViolation,
    /// The account identity on this device changed.
    AccountChange,
}

impl ChangeReason {
    /// Whether this reason should trigger a download-and-merge pass.
    pub fn triggers_merge(&self) -> bool {
        !matches!(self, Self::QuotaViolation)
    }
}

/// A "changed externally" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChange {
    pub reason: ChangeReason,
    /// Keys the store says changed. Informational: a pass always merges
    /// every synchronized key.
    pub changed_keys: Vec<String>,
}

impl RemoteChange {
    pub fn new(reason: ChangeReason) -> Self {
        Self {
            reason,
            changed_keys: Vec::new(),
        }
    }
}

/// User-implemented access to the remote key-value store.
///
/// `get` and `set` are best-effort: the store may hold writes locally until
/// the next `synchronize()`, and may drop them later on quota grounds.
#[async_trait]
pub trait RemoteRecordStore: Send + Sync {
    /// The account this device is bound to, or `None` when signed out.
    async fn account_identity(&self) -> Option<String>;

    async fn get(&self, key: &str) -> Option<Blob>;

    async fn set(&self, key: &str, value: &[u8]);

    /// Force an upload/flush attempt.
    async fn synchronize(&self) -> Result<(), RemoteStoreError>;

    /// Subscribe to external change notifications. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<RemoteChange>;
}
