//! Progress accounting
//!
//! Atomically-updated running totals, readable at any point during or
//! after a run as an immutable [`Counter`] snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared tally updated by workers and retry tasks.
#[derive(Debug)]
pub struct Progress {
    /// Statements acknowledged by the server.
    nquads: AtomicU64,
    /// Transactions committed.
    txns: AtomicU64,
    /// Aborts observed (one per failed attempt sent to retry).
    aborts: AtomicU64,
    start: Instant,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            nquads: AtomicU64::new(0),
            txns: AtomicU64::new(0),
            aborts: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Record one committed batch of `statements` statements.
    pub fn add_committed(&self, statements: u64) {
        self.nquads.fetch_add(statements, Ordering::Relaxed);
        self.txns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_abort(&self) {
        self.aborts.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot; safe concurrently with in-flight commits.
    pub fn snapshot(&self) -> Counter {
        Counter {
            nquads: self.nquads.load(Ordering::Relaxed),
            txns_done: self.txns.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            elapsed: self.start.elapsed(),
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a batch mutation run at a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counter {
    /// Statements processed by the server.
    pub nquads: u64,
    /// Transactions committed.
    pub txns_done: u64,
    /// Aborts observed.
    pub aborts: u64,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

impl Counter {
    /// Statements per second. Runs that finish in under a second report
    /// the raw statement count rather than dividing by a rounded zero.
    pub fn rate(&self) -> u64 {
        let secs = self.elapsed.as_secs();
        if secs < 1 {
            self.nquads
        } else {
            self.nquads / secs
        }
    }
}
