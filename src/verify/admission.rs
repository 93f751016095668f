//! Global ceiling on concurrently running trial loads.
//!
//! Admission goes through a fair semaphore, so waiters are served in
//! arrival order. A [`SlotGuard`] releases its slot when dropped, which
//! covers success, failure, timeout and a caller dropping the future.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Default ceiling on simultaneous trials.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Snapshot of the admission queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifierStats {
    pub active: usize,
    pub queued: usize,
    pub max_concurrent: usize,
}

pub(crate) struct Admission {
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    active: Arc<AtomicUsize>,
    queued: Arc<AtomicUsize>,
    cleared: Notify,
}

/// Held for the lifetime of one admitted verification.
pub(crate) struct SlotGuard {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // Counter first, permit (field) after: `active` never overshoots.
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct QueuedGuard(Arc<AtomicUsize>);

impl Drop for QueuedGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Admission {
    pub(crate) fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            active: Arc::new(AtomicUsize::new(0)),
            queued: Arc::new(AtomicUsize::new(0)),
            cleared: Notify::new(),
        }
    }

    /// Wait for a slot. `None` if the queue was cleared while waiting.
    pub(crate) async fn admit(&self) -> Option<SlotGuard> {
        let permit = if let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() {
            permit
        } else {
            let cleared = self.cleared.notified();
            tokio::pin!(cleared);
            cleared.as_mut().enable();

            self.queued.fetch_add(1, Ordering::SeqCst);
            let _queued = QueuedGuard(Arc::clone(&self.queued));
            debug!(
                queued = self.queued.load(Ordering::SeqCst),
                "all trial slots busy, queueing"
            );

            tokio::select! {
                permit = Arc::clone(&self.slots).acquire_owned() => permit.ok()?,
                () = &mut cleared => return None,
            }
        };

        self.active.fetch_add(1, Ordering::SeqCst);
        Some(SlotGuard {
            _permit: permit,
            active: Arc::clone(&self.active),
        })
    }

    /// Reject every waiter currently queued. Returns how many were waiting.
    pub(crate) fn clear_queue(&self) -> usize {
        let waiting = self.queued.load(Ordering::SeqCst);
        self.cleared.notify_waiters();
        waiting
    }

    pub(crate) fn stats(&self) -> VerifierStats {
        VerifierStats {
            active: self.active.load(Ordering::SeqCst),
            queued: self.queued.load(Ordering::SeqCst),
            max_concurrent: self.max_concurrent,
        }
    }
}
