//! In-process simulation of the shared remote store.
//!
//! A [`SharedKvStore`] plays the server; each [`DeviceStore`] is one device's
//! view of it. Writes are staged on the device and only become visible to
//! other devices when that device calls `synchronize()`, at which point every
//! other signed-in device receives a `ServerChange` notification. Quota is
//! enforced at publish time: a write that would push the store over its key
//! or byte limit is dropped and the writer receives `QuotaViolation`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::RemoteStoreError;
use crate::types::Blob;

use super::{ChangeReason, RemoteChange, RemoteRecordStore};

pub const DEFAULT_MAX_KEYS: usize = 1024;
pub const DEFAULT_MAX_TOTAL_BYTES: usize = 1024 * 1024;

const NOTIFY_CAPACITY: usize = 64;

// ============================================================================
// SharedKvStore
// ============================================================================

#[derive(Clone)]
pub struct SharedKvStore {
    hub: Arc<Mutex<Hub>>,
    next_device: Arc<AtomicU64>,
}

struct Hub {
    values: HashMap<String, Blob>,
    devices: Vec<DeviceSlot>,
    max_keys: usize,
    max_total_bytes: usize,
}

struct DeviceSlot {
    id: u64,
    notifier: broadcast::Sender<RemoteChange>,
    signed_in: Arc<Mutex<Option<String>>>,
}

impl Hub {
    fn total_bytes(&self) -> usize {
        self.values.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Notify every signed-in device except `origin`.
    fn broadcast_from(&self, origin: Option<u64>, change: &RemoteChange) {
        for slot in &self.devices {
            if Some(slot.id) == origin || slot.signed_in.lock().is_none() {
                continue;
            }
            // No receivers just means that device is not observing.
            let _ = slot.notifier.send(change.clone());
        }
    }
}

impl SharedKvStore {
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_MAX_KEYS, DEFAULT_MAX_TOTAL_BYTES)
    }

    pub fn with_quota(max_keys: usize, max_total_bytes: usize) -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub {
                values: HashMap::new(),
                devices: Vec::new(),
                max_keys,
                max_total_bytes,
            })),
            next_device: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Attach a new device signed in to `account`.
    pub fn device(&self, account: impl Into<String>) -> DeviceStore {
        let id = self.next_device.fetch_add(1, Ordering::Relaxed);
        let (notifier, _) = broadcast::channel(NOTIFY_CAPACITY);
        let signed_in = Arc::new(Mutex::new(Some(account.into())));
        self.hub.lock().devices.push(DeviceSlot {
            id,
            notifier: notifier.clone(),
            signed_in: Arc::clone(&signed_in),
        });
        DeviceStore {
            id,
            hub: Arc::clone(&self.hub),
            notifier,
            signed_in,
            staged: Mutex::new(BTreeMap::new()),
            failure: Mutex::new(None),
            sync_calls: AtomicUsize::new(0),
        }
    }

    /// Write a value as if some other device had published it, notifying
    /// every signed-in device.
    pub fn publish_external(&self, key: &str, value: &[u8]) {
        let mut hub = self.hub.lock();
        hub.values.insert(key.to_string(), value.to_vec());
        let change = RemoteChange {
            reason: ChangeReason::ServerChange,
            changed_keys: vec![key.to_string()],
        };
        hub.broadcast_from(None, &change);
    }

    /// The published value for `key`, ignoring anything still staged.
    pub fn published(&self, key: &str) -> Option<Blob> {
        self.hub.lock().values.get(key).cloned()
    }
}

impl Default for SharedKvStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// DeviceStore
// ============================================================================

pub struct DeviceStore {
    id: u64,
    hub: Arc<Mutex<Hub>>,
    notifier: broadcast::Sender<RemoteChange>,
    signed_in: Arc<Mutex<Option<String>>>,
    staged: Mutex<BTreeMap<String, Blob>>,
    failure: Mutex<Option<String>>,
    sync_calls: AtomicUsize,
}

impl DeviceStore {
    pub fn sign_out(&self) {
        *self.signed_in.lock() = None;
        self.staged.lock().clear();
        let _ = self.notifier.send(RemoteChange::new(ChangeReason::AccountChange));
    }

    pub fn sign_in(&self, account: impl Into<String>) {
        *self.signed_in.lock() = Some(account.into());
        let _ = self.notifier.send(RemoteChange::new(ChangeReason::AccountChange));
    }

    /// Make every `synchronize()` fail with `message` until cleared with `None`.
    pub fn fail_synchronize(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }

    /// Deliver a notification to this device only.
    pub fn notify(&self, change: RemoteChange) {
        let _ = self.notifier.send(change);
    }

    /// How many times `synchronize()` has been called.
    pub fn synchronize_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    /// Writes waiting for the next `synchronize()`.
    pub fn staged_keys(&self) -> Vec<String> {
        self.staged.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl RemoteRecordStore for DeviceStore {
    async fn account_identity(&self) -> Option<String> {
        self.signed_in.lock().clone()
    }

    async fn get(&self, key: &str) -> Option<Blob> {
        if self.signed_in.lock().is_none() {
            return None;
        }
        if let Some(staged) = self.staged.lock().get(key) {
            return Some(staged.clone());
        }
        self.hub.lock().values.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &[u8]) {
        if self.signed_in.lock().is_none() {
            return;
        }
        self.staged.lock().insert(key.to_string(), value.to_vec());
    }

    async fn synchronize(&self) -> Result<(), RemoteStoreError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        if self.signed_in.lock().is_none() {
            return Err(RemoteStoreError::NoIdentity);
        }
        if let Some(message) = self.failure.lock().clone() {
            return Err(RemoteStoreError::Transport(message));
        }

        let staged = std::mem::take(&mut *self.staged.lock());
        if staged.is_empty() {
            return Ok(());
        }

        let mut hub = self.hub.lock();
        let mut published = Vec::new();
        let mut rejected = Vec::new();
        for (key, value) in staged {
            let previous = hub.values.get(&key).map(|v| key.len() + v.len()).unwrap_or(0);
            let projected = hub.total_bytes() - previous + key.len() + value.len();
            let new_key = !hub.values.contains_key(&key);
            if projected > hub.max_total_bytes || (new_key && hub.values.len() >= hub.max_keys) {
                rejected.push(key);
                continue;
            }
            if hub.values.get(&key) != Some(&value) {
                hub.values.insert(key.clone(), value);
                published.push(key);
            }
        }

        if !published.is_empty() {
            let change = RemoteChange {
                reason: ChangeReason::ServerChange,
                changed_keys: published,
            };
            hub.broadcast_from(Some(self.id), &change);
        }
        if !rejected.is_empty() {
            let _ = self.notifier.send(RemoteChange {
                reason: ChangeReason::QuotaViolation,
                changed_keys: rejected,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteChange> {
        self.notifier.subscribe()
    }
}
