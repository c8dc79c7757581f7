//! EventEmitter<T> — typed pub/sub for coordinator signals.
//!
//! Emission works on a snapshot of the listener list: a listener removed
//! while an event is being delivered still receives that event, and one added
//! during delivery waits for the next. A panicking listener is logged and
//! skipped so the remaining listeners (and the coordinator task that emits)
//! keep running.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle returned by [`EventEmitter::on`], used to unsubscribe.
pub type ListenerId = u64;

pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

pub struct EventEmitter<T> {
    listeners: Mutex<Vec<(ListenerId, Arc<ListenerFn<T>>)>>,
    next_id: AtomicU64,
}

impl<T: std::fmt::Debug> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn on(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(callback)));
        id
    }

    /// Unknown ids are ignored, so calling this twice is harmless.
    pub fn off(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Deliver `event` and return how many listeners handled it without
    /// panicking. The lock is released before any callback runs.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot: Vec<(ListenerId, Arc<ListenerFn<T>>)> = self
            .listeners
            .lock()
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();

        let mut delivered = 0;
        for (id, cb) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| cb(event))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::warn!(listener = id, ?event, "event listener panicked"),
            }
        }
        delivered
    }
}

impl<T: std::fmt::Debug> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
