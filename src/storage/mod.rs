pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

use std::sync::Arc;

use crate::config::SyncConfig;
use crate::error::Result;

pub use memory::MemoryRecordStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRecordStore;
pub use traits::LocalRecordStore;

/// Open the local store named by `config.local_store_path`, initialized and
/// ready to use. Without a path the store lives in memory.
pub fn open_configured(config: &SyncConfig) -> Result<Arc<dyn LocalRecordStore>> {
    let Some(path) = config.local_store_path.as_deref() else {
        return Ok(Arc::new(MemoryRecordStore::new()));
    };
    open_file(path)
}

#[cfg(feature = "sqlite")]
fn open_file(path: &std::path::Path) -> Result<Arc<dyn LocalRecordStore>> {
    let mut store = SqliteRecordStore::open(path)?;
    store.initialize()?;
    tracing::debug!(path = %path.display(), "opened sqlite local store");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
fn open_file(path: &std::path::Path) -> Result<Arc<dyn LocalRecordStore>> {
    Err(crate::error::ConfigError::Invalid {
        field: "local_store_path".to_string(),
        reason: format!("{} needs the `sqlite` feature", path.display()),
    }
    .into())
}
