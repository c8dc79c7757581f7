use thiserror::Error;

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Local store not initialized. Call initialize() first.")]
    NotInitialized,

    #[error("Local store I/O failed for key \"{key}\": {message}")]
    Io { key: String, message: String },

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// CodecError
// ---------------------------------------------------------------------------

/// A collection or scalar blob could not be encoded or decoded.
#[derive(Debug, Error)]
#[error("Failed to {op} blob for \"{key}\"")]
pub struct CodecError {
    pub key: String,
    pub op: CodecOp,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecOp {
    Encode,
    Decode,
}

impl std::fmt::Display for CodecOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode => f.write_str("encode"),
            Self::Decode => f.write_str("decode"),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteStoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteStoreError {
    /// The device is not bound to a remote account.
    #[error("No remote account identity on this device")]
    NoIdentity,

    #[error("Remote synchronize failed: {0}")]
    Transport(String),

    #[error("Remote store quota exceeded: {0}")]
    Quota(String),
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value for \"{field}\": {reason}")]
    Invalid { field: String, reason: String },
}

// ---------------------------------------------------------------------------
// SyncError — top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Remote(#[from] RemoteStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown sync key: {0}")]
    UnknownKey(String),

    /// JSON has no encoding for NaN or infinity, so such an entry would
    /// leave the stored collection undecodable.
    #[error("Non-finite {field} in {key} entry")]
    NonFinite { key: String, field: &'static str },

    #[error("Sync coordinator has shut down")]
    Shutdown,
}

/// Convenience alias — the default error type is `SyncError`.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
