//! Batch mutation options
//!
//! Immutable configuration for one load run, created before the run starts.

use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct BatchMutationOptions {
    /// Statements per transaction. Every batch except possibly the last
    /// has exactly this size.
    pub batch_size: usize,
    /// Number of concurrent workers submitting batches.
    pub concurrency: usize,
    /// Cancellation signal polled by the producer before each chunk.
    pub cancel: CancellationToken,
    /// Cap on retries per batch. `None` retries forever, which is the
    /// stance a bulk load wants: eventually complete or be killed.
    pub max_retries: Option<u32>,
    /// Log running totals in the end-of-run summary.
    pub print_counters: bool,
}

impl BatchMutationOptions {
    pub fn new(batch_size: usize, concurrency: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
            cancel: CancellationToken::new(),
            max_retries: None,
            print_counters: true,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for BatchMutationOptions {
    fn default() -> Self {
        Self::new(1000, 10)
    }
}
