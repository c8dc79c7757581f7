//! SyncCoordinator — drives upload, download and merge for the synchronized
//! keys.
//!
//! The coordinator is an actor: one tokio task owns the stores and processes
//! commands strictly one at a time, so a pass and an upload can never
//! interleave their read-merge-write cycles. [`SyncCoordinator`] is the
//! cloneable handle that collaborators hold.
//!
//! Remote-change notifications are received on a separate forwarder task
//! and marshaled into the actor's mailbox. Merge-triggering notifications are
//! coalesced: while one pass request is queued and not yet started, further
//! notifications are dropped, so a burst arriving during a pass produces at
//! most one follow-up pass.
//!
//! Errors are absorbed into the returned reports and logged. Only a dead
//! actor surfaces as `Err(SyncError::Shutdown)`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Result, SyncError};
use crate::events::{EventEmitter, ListenerId, SyncEvent};
use crate::merge::merge_blobs;
use crate::remote::{ChangeReason, RemoteChange, RemoteRecordStore};
use crate::storage::LocalRecordStore;
use crate::types::SyncKey;

use super::types::*;

// ============================================================================
// Handle
// ============================================================================

#[derive(Clone)]
pub struct SyncCoordinator {
    commands: mpsc::Sender<Command>,
    shared: Arc<Shared>,
}

/// State readable from any handle without going through the mailbox.
struct Shared {
    status: Mutex<SyncStatus>,
    events: EventEmitter<SyncEvent>,
    /// A notification-driven pass is queued in the mailbox and not started.
    pass_queued: AtomicBool,
    passes: AtomicU64,
    last_pass: Mutex<Option<PassReport>>,
}

enum Command {
    Start(oneshot::Sender<SyncStatus>),
    Stop(oneshot::Sender<SyncStatus>),
    UploadKey(SyncKey, oneshot::Sender<UploadReport>),
    UploadAll(oneshot::Sender<UploadReport>),
    MergeAll(oneshot::Sender<PassReport>),
    Notification {
        change: RemoteChange,
        generation: u64,
    },
}

impl SyncCoordinator {
    /// Spawn the coordinator task on the current tokio runtime.
    pub fn spawn(
        local: Arc<dyn LocalRecordStore>,
        remote: Arc<dyn RemoteRecordStore>,
        options: SyncCoordinatorOptions,
    ) -> Self {
        let (tx, rx) = mpsc::channel(options.mailbox_capacity.max(1));
        let shared = Arc::new(Shared {
            status: Mutex::new(SyncStatus::default()),
            events: EventEmitter::new(),
            pass_queued: AtomicBool::new(false),
            passes: AtomicU64::new(0),
            last_pass: Mutex::new(None),
        });

        let actor = Actor {
            local,
            remote,
            keys: options.keys,
            enabled: options.enabled,
            shared: Arc::clone(&shared),
            mailbox: tx.downgrade(),
            forwarder: None,
            generation: 0,
        };
        tokio::spawn(actor.run(rx));

        Self {
            commands: tx,
            shared,
        }
    }

    /// Check identity, subscribe to notifications, flush, then run one full
    /// pass. A no-op while already observing.
    pub async fn start_sync(&self) -> Result<SyncStatus> {
        self.request(Command::Start).await
    }

    /// Unsubscribe from notifications. Queued notifications are discarded;
    /// a pass already running finishes.
    pub async fn stop_sync(&self) -> Result<SyncStatus> {
        self.request(Command::Stop).await
    }

    /// Push the local value of `key` to the remote store and flush it.
    pub async fn upload_key(&self, key: SyncKey) -> Result<UploadReport> {
        self.request(|tx| Command::UploadKey(key, tx)).await
    }

    /// Push every synchronized key, then flush once.
    pub async fn upload_all(&self) -> Result<UploadReport> {
        self.request(Command::UploadAll).await
    }

    /// Merge every synchronized key from the remote store into the local store.
    pub async fn download_and_merge_all(&self) -> Result<PassReport> {
        self.request(Command::MergeAll).await
    }

    /// Current observing/available flags.
    pub fn status(&self) -> SyncStatus {
        *self.shared.status.lock()
    }

    /// Whether remote-change notifications are being received.
    pub fn is_observing(&self) -> bool {
        self.status().observing
    }

    /// Whether the remote store is usable for this session.
    pub fn is_available(&self) -> bool {
        self.status().available
    }

    /// Passes that actually ran, whoever requested them.
    pub fn completed_passes(&self) -> u64 {
        self.shared.passes.load(Ordering::SeqCst)
    }

    /// Report of the most recent pass, if any has run.
    pub fn last_pass(&self) -> Option<PassReport> {
        self.shared.last_pass.lock().clone()
    }

    /// Register a listener for [`SyncEvent`]s. Listeners run on the
    /// coordinator task and must not block.
    pub fn on_event(&self, callback: impl Fn(&SyncEvent) + Send + Sync + 'static) -> ListenerId {
        self.shared.events.on(callback)
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn off_event(&self, id: ListenerId) {
        self.shared.events.off(id);
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SyncError::Shutdown)?;
        rx.await.map_err(|_| SyncError::Shutdown)
    }
}

// ============================================================================
// Actor
// ============================================================================

struct Actor {
    local: Arc<dyn LocalRecordStore>,
    remote: Arc<dyn RemoteRecordStore>,
    keys: Vec<SyncKey>,
    enabled: bool,
    shared: Arc<Shared>,
    /// Weak so the forwarder never keeps the actor alive after every handle
    /// is gone.
    mailbox: mpsc::WeakSender<Command>,
    forwarder: Option<JoinHandle<()>>,
    /// Bumped on every subscribe/unsubscribe; stale notifications are dropped.
    generation: u64,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Start(reply) => {
                    let status = self.start().await;
                    let _ = reply.send(status);
                }
                Command::Stop(reply) => {
                    let _ = reply.send(self.stop());
                }
                Command::UploadKey(key, reply) => {
                    let report = self.upload(&[key]).await;
                    let _ = reply.send(report);
                }
                Command::UploadAll(reply) => {
                    let keys = self.keys.clone();
                    let report = self.upload(&keys).await;
                    let _ = reply.send(report);
                }
                Command::MergeAll(reply) => {
                    let report = self.merge_all().await;
                    let _ = reply.send(report);
                }
                Command::Notification { change, generation } => {
                    self.on_remote_change(change, generation).await;
                }
            }
        }
        self.stop();
        tracing::debug!("sync coordinator stopped");
    }

    fn set_status(&self, f: impl FnOnce(&mut SyncStatus)) -> SyncStatus {
        let mut status = self.shared.status.lock();
        f(&mut status);
        *status
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    async fn start(&mut self) -> SyncStatus {
        let current = *self.shared.status.lock();
        if current.observing {
            return current;
        }

        if !self.enabled {
            tracing::info!("sync disabled by configuration");
            return self.set_status(|s| s.available = false);
        }

        if self.remote.account_identity().await.is_none() {
            tracing::info!("no remote account on this device, sync unavailable");
            return self.set_status(|s| s.available = false);
        }

        // Subscribe before flushing so nothing published in between is missed.
        let notifications = self.remote.subscribe();
        if let Err(e) = self.remote.synchronize().await {
            tracing::warn!(error = %e, "remote synchronize failed, sync unavailable for this session");
            return self.set_status(|s| s.available = false);
        }

        self.generation += 1;
        self.shared.pass_queued.store(false, Ordering::SeqCst);
        self.forwarder = Some(tokio::spawn(forward_notifications(
            notifications,
            self.mailbox.clone(),
            Arc::clone(&self.shared),
            self.generation,
        )));
        self.set_status(|s| {
            s.available = true;
            s.observing = true;
        });
        tracing::info!(keys = self.keys.len(), "sync started");

        self.merge_all().await;
        *self.shared.status.lock()
    }

    fn stop(&mut self) -> SyncStatus {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
            self.generation += 1;
            tracing::info!("sync stopped");
        }
        self.shared.pass_queued.store(false, Ordering::SeqCst);
        self.set_status(|s| s.observing = false)
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    async fn on_remote_change(&mut self, change: RemoteChange, generation: u64) {
        // A stale notification must not clear the flag the current
        // forwarder owns.
        if generation != self.generation || self.forwarder.is_none() {
            tracing::debug!(reason = ?change.reason, "dropping notification from a stale subscription");
            return;
        }
        if change.reason.triggers_merge() {
            self.shared.pass_queued.store(false, Ordering::SeqCst);
        }

        match change.reason {
            ChangeReason::QuotaViolation => {
                tracing::warn!(keys = ?change.changed_keys, "remote store quota violated, writes may have been dropped");
            }
            ChangeReason::ServerChange | ChangeReason::InitialSync | ChangeReason::AccountChange => {
                if self.remote.account_identity().await.is_none() {
                    tracing::info!(reason = ?change.reason, "remote account gone, sync unavailable");
                    self.set_status(|s| s.available = false);
                    return;
                }
                self.set_status(|s| s.available = true);
                tracing::debug!(reason = ?change.reason, keys = ?change.changed_keys, "remote change");
                self.merge_all().await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Upload
    // -----------------------------------------------------------------------

    async fn upload(&mut self, keys: &[SyncKey]) -> UploadReport {
        let mut report = UploadReport::default();
        let available = self.shared.status.lock().available;

        for &key in keys {
            if !available {
                report.skipped.push((key, SkipReason::Unavailable));
                continue;
            }
            if !self.keys.contains(&key) {
                report.skipped.push((key, SkipReason::NotSynchronized));
                continue;
            }
            match self.local.get(key.as_str()) {
                Ok(Some(blob)) => {
                    self.remote.set(key.as_str(), &blob).await;
                    report.uploaded.push(key);
                }
                Ok(None) => report.skipped.push((key, SkipReason::NoLocalValue)),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "failed to read local value for upload");
                    report.failures.push(KeyFailure {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.uploaded.is_empty() {
            if let Err(e) = self.remote.synchronize().await {
                tracing::warn!(error = %e, keys = ?report.uploaded, "remote flush after upload failed");
                report.flush_error = Some(e);
            }
        }
        report
    }

    // -----------------------------------------------------------------------
    // Download and merge
    // -----------------------------------------------------------------------

    async fn merge_all(&mut self) -> PassReport {
        let mut report = PassReport::default();
        if !self.shared.status.lock().available {
            tracing::debug!("merge pass skipped, sync unavailable");
            return report;
        }
        report.ran = true;

        for &key in &self.keys {
            let remote = self.remote.get(key.as_str()).await;

            // The local value is read inside update() so a collaborator's
            // append made since the last pass is merged, not overwritten.
            let mut undecodable = Vec::new();
            let written = self.local.update(key.as_str(), &mut |local| {
                let merged = merge_blobs(key, local, remote.as_deref());
                undecodable = merged.undecodable;
                if merged.changed {
                    merged.value
                } else {
                    None
                }
            });

            report
                .undecodable
                .extend(undecodable.into_iter().map(|side| (key, side)));
            match written {
                Ok(true) => report.changed.push(key),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%key, error = %e, "local write failed during merge");
                    report.failures.push(KeyFailure {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.changed.is_empty() {
            let listeners = self.shared.events.emit(&SyncEvent::Completed);
            tracing::debug!(listeners, "sync completed signal emitted");
            report.signaled = true;
        }
        tracing::debug!(
            changed = ?report.changed,
            undecodable = report.undecodable.len(),
            failures = report.failures.len(),
            "merge pass finished"
        );

        self.shared.passes.fetch_add(1, Ordering::SeqCst);
        *self.shared.last_pass.lock() = Some(report.clone());
        report
    }
}

// ============================================================================
// Notification forwarding
// ============================================================================

async fn forward_notifications(
    mut notifications: broadcast::Receiver<RemoteChange>,
    mailbox: mpsc::WeakSender<Command>,
    shared: Arc<Shared>,
    generation: u64,
) {
    loop {
        let change = match notifications.recv().await {
            Ok(change) => change,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "remote notifications lagged, scheduling a full pass");
                RemoteChange::new(ChangeReason::ServerChange)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if change.reason.triggers_merge() && shared.pass_queued.swap(true, Ordering::SeqCst) {
            tracing::trace!(reason = ?change.reason, "coalesced into queued pass");
            continue;
        }

        let Some(mailbox) = mailbox.upgrade() else {
            break;
        };
        if mailbox
            .send(Command::Notification { change, generation })
            .await
            .is_err()
        {
            break;
        }
    }
}
