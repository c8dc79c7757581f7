//! Blob encoding for collection keys.
//!
//! A collection blob is a JSON array of entries. JSON arrays are
//! self-delimiting, so a blob never needs a separate length prefix.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecOp};
use crate::types::{Blob, SyncKey};

pub fn encode_entries<E: Serialize>(key: SyncKey, entries: &[E]) -> Result<Blob, CodecError> {
    serde_json::to_vec(entries).map_err(|source| CodecError {
        key: key.as_str().to_string(),
        op: CodecOp::Encode,
        source,
    })
}

pub fn decode_entries<E: DeserializeOwned>(key: SyncKey, blob: &[u8]) -> Result<Vec<E>, CodecError> {
    serde_json::from_slice(blob).map_err(|source| CodecError {
        key: key.as_str().to_string(),
        op: CodecOp::Decode,
        source,
    })
}

/// Encode a settings value for a scalar key.
pub fn encode_scalar<T: Serialize>(key: SyncKey, value: &T) -> Result<Blob, CodecError> {
    serde_json::to_vec(value).map_err(|source| CodecError {
        key: key.as_str().to_string(),
        op: CodecOp::Encode,
        source,
    })
}

pub fn decode_scalar<T: DeserializeOwned>(key: SyncKey, blob: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(blob).map_err(|source| CodecError {
        key: key.as_str().to_string(),
        op: CodecOp::Decode,
        source,
    })
}
