//! Typed access to the scalar (settings) keys.
//!
//! A scalar blob is the JSON encoding of one value. Merges overwrite the
//! whole blob, so these helpers never look inside a stored value beyond
//! decoding it.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{decode_scalar, encode_scalar};
use crate::error::{Result, SyncError};
use crate::storage::LocalRecordStore;
use crate::types::SyncKey;

/// Read the value stored under a scalar key.
pub fn get<T: DeserializeOwned>(store: &dyn LocalRecordStore, key: SyncKey) -> Result<Option<T>> {
    ensure_scalar(key)?;
    match store.get(key.as_str())? {
        Some(blob) => Ok(Some(decode_scalar(key, &blob)?)),
        None => Ok(None),
    }
}

/// Replace the value stored under a scalar key.
pub fn set<T: Serialize>(store: &dyn LocalRecordStore, key: SyncKey, value: &T) -> Result<()> {
    ensure_scalar(key)?;
    let blob = encode_scalar(key, value)?;
    store.set(key.as_str(), &blob)?;
    Ok(())
}

fn ensure_scalar(key: SyncKey) -> Result<()> {
    if key.is_collection() {
        return Err(SyncError::UnknownKey(format!("{key} is a collection key")));
    }
    Ok(())
}
