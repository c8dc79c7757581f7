pub mod coordinator;
pub mod types;

pub use coordinator::SyncCoordinator;
pub use types::{
    KeyFailure, PassReport, SkipReason, SyncCoordinatorOptions, SyncStatus, UploadReport,
};
