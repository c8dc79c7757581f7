pub mod error;
pub mod types;

pub mod codec;
pub mod collections;
pub mod config;
pub mod events;
pub mod merge;
pub mod remote;
pub mod scalars;
pub mod storage;
pub mod sync;
pub mod telemetry;

pub use config::SyncConfig;
pub use error::{CodecError, ConfigError, RemoteStoreError, Result, StorageError, SyncError};
pub use events::SyncEvent;
pub use merge::{merge_blobs, strategy_for, CollectionEntry, MergeStrategy, Merged, Side};
pub use remote::{ChangeReason, RemoteChange, RemoteRecordStore};
pub use storage::{LocalRecordStore, MemoryRecordStore};
#[cfg(feature = "sqlite")]
pub use storage::SqliteRecordStore;
pub use sync::{SyncCoordinator, SyncCoordinatorOptions, SyncStatus};
pub use types::{Favorite, FavoriteKind, NetworkProfile, QualitySample, SpeedTestResult, SyncKey};
