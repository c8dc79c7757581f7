//! In-process `LocalRecordStore` backed by a `HashMap`.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{Result, StorageError};
use crate::types::Blob;

use super::traits::{LocalRecordStore, UpdateFn};

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, Blob>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl LocalRecordStore for MemoryRecordStore {
    fn get(&self, key: &str) -> Result<Option<Blob>, StorageError> {
        Ok(self.records.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.records.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.records.lock().remove(key);
        Ok(())
    }

    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<bool, StorageError> {
        // The lock is held across `f`; callbacks must not re-enter the store.
        let mut records = self.records.lock();
        match f(records.get(key).map(Vec::as_slice)) {
            Some(value) => {
                records.insert(key.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
