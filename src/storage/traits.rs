//! Local store traits for netpulse-sync.
//!
//! `LocalRecordStore` is the narrow key → blob interface the coordinator and
//! the collection helpers need. Concrete stores live next to it
//! (`MemoryRecordStore`, `SqliteRecordStore`).
use crate::error::{Result, StorageError};
use crate::types::Blob;

/// Callback passed to [`LocalRecordStore::update`]. Receives the current
/// value and returns the value to write, or `None` to leave the key as is.
pub type UpdateFn<'a> = dyn FnMut(Option<&[u8]>) -> Option<Blob> + 'a;

/// Durable key → opaque blob storage on this device.
///
/// Implementors must be `Send + Sync` so one store can be shared between the
/// coordinator and the collaborators that append entries.
///
/// # Threading
/// All methods are synchronous. Callers on an async runtime should keep the
/// values small (the largest collection is a few hundred KiB).
pub trait LocalRecordStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Blob>, StorageError>;

    /// Insert or replace the value for `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Read-modify-write `key` atomically with respect to every other call on
    /// this store. Returns `true` when `f` produced a value and it was written.
    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<bool, StorageError>;
}
