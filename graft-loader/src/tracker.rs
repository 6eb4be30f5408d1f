//! Completion tracking
//!
//! The loader needs to tell "all initial dispatches attempted" apart from
//! "all retries finished", because workers can spawn retry tasks right up
//! until they exit. Each phase gets its own tracker; the retry tracker is
//! only awaited once the dispatch tracker is satisfied.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Counts outstanding tasks and wakes waiters when the count hits zero.
///
/// Unlike a join handle set, the pending count is observable, and tasks
/// may be added while others are completing.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    pending: AtomicUsize,
    notify: Notify,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one task. Must happen before the task is spawned so the
    /// count never under-reads.
    pub fn add(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark one task finished.
    pub fn done(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Tasks registered but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until the pending count reaches zero. Returns immediately if
    /// nothing is outstanding.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}
