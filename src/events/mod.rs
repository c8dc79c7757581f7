//! Signals published by the coordinator.
//!
//! UI collaborators subscribe through [`crate::sync::SyncCoordinator::on_event`]
//! and refresh their views when [`SyncEvent::Completed`] arrives.

pub mod emitter;

pub use emitter::{EventEmitter, ListenerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// A download-and-merge pass finished and changed at least one local key.
    Completed,
}
