//! Loader orchestration
//!
//! Owns the full pipeline: decode → resolve → accumulate → bounded queue →
//! worker pool → mutation transport, with failed batches looping through
//! the retry engine until they commit.
//!
//! ## Shutdown ordering
//!
//! The run moves through explicit phases:
//!
//! 1. **Dispatching** — producer feeds the queue, workers submit batches.
//! 2. **Draining** — queue closed; wait for every worker to exit. Workers
//!    can spawn retry tasks right up to this point.
//! 3. **RetryDraining** — wait for the retry tracker; retries can spawn
//!    further retries, the tracker follows them.
//! 4. **Done** — flush the identifier mapping, log the summary.
//!
//! Fatal failures record the error, cancel the run token and let the
//! phases drain; the recorded error is surfaced at the end.

use crate::batcher::Batcher;
use crate::error::{LoadError, Result};
use crate::options::BatchMutationOptions;
use crate::progress::{Counter, Progress};
use crate::tracker::CompletionTracker;
use graft_chunk::Chunker;
use graft_client::{ErrorClass, MutationClient};
use graft_core::{ObjectValue, Statement};
use graft_xidmap::XidMap;
use rand::Rng;
use std::io::BufRead;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// First backoff delay of the retry engine.
const BACKOFF_START: Duration = Duration::from_millis(1);
/// Backoff ceiling.
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Outcome of one logical commit attempt.
enum Attempt {
    /// Committed and counted.
    Done,
    /// Transient or unknown failure; the batch goes to the retry engine.
    Retry(graft_client::ClientError),
    /// A fatal error has been recorded or the run token is cancelled;
    /// drop the batch and wind down.
    Stop,
}

/// State shared between the producer, workers and retry tasks.
struct Shared {
    client: Arc<dyn MutationClient>,
    progress: Arc<Progress>,
    opts: BatchMutationOptions,
    /// Phase-1 tracker: one entry per worker.
    dispatches: CompletionTracker,
    /// Phase-2 tracker: one entry per live retry task.
    retries: CompletionTracker,
    /// First fatal error observed; ends the run.
    fatal: Mutex<Option<LoadError>>,
}

impl Shared {
    fn fatal_seen(&self) -> bool {
        self.fatal.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    fn record_fatal(&self, err: LoadError) {
        let mut slot = self.fatal.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        self.opts.cancel.cancel();
    }

    fn take_fatal(&self) -> Option<LoadError> {
        self.fatal.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// One logical commit attempt. Sleeps through overload cooldowns in
    /// place; returns as soon as the outcome is known.
    async fn commit_once(&self, batch: &[Statement]) -> Attempt {
        loop {
            if self.fatal_seen() {
                return Attempt::Stop;
            }
            let err = match self.client.commit(batch).await {
                Ok(()) => {
                    self.progress.add_committed(batch.len() as u64);
                    return Attempt::Done;
                }
                Err(err) => err,
            };
            match err.classify() {
                ErrorClass::Fatal => {
                    error!(error = %err, "fatal mutation error, aborting run");
                    self.record_fatal(LoadError::Fatal(err));
                    return Attempt::Stop;
                }
                ErrorClass::Overloaded => {
                    let cooldown =
                        Duration::from_secs(60 * rand::thread_rng().gen_range(1..=10));
                    warn!(
                        cooldown_secs = cooldown.as_secs(),
                        "server overloaded, cooling down before re-attempt"
                    );
                    // Cancellation ends the cooldown and the attempt; the
                    // batch is dropped instead of re-hitting an already
                    // overloaded server with no delay.
                    tokio::select! {
                        _ = tokio::time::sleep(cooldown) => {}
                        _ = self.opts.cancel.cancelled() => return Attempt::Stop,
                    }
                }
                ErrorClass::Transient => {
                    self.progress.add_abort();
                    return Attempt::Retry(err);
                }
                ErrorClass::Unknown => {
                    warn!(error = %err, "error while mutating");
                    self.progress.add_abort();
                    return Attempt::Retry(err);
                }
            }
        }
    }

    /// Initial dispatch of a batch; transient failures move it to the
    /// retry engine without holding up the worker.
    async fn submit(self: &Arc<Self>, batch: Vec<Statement>) {
        match self.commit_once(&batch).await {
            Attempt::Done | Attempt::Stop => {}
            Attempt::Retry(_) => self.spawn_retry(batch),
        }
    }

    /// Hand a batch to the retry engine. Registered on the retry tracker
    /// before spawning so the pending count never under-reads.
    fn spawn_retry(self: &Arc<Self>, batch: Vec<Statement>) {
        self.retries.add();
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.retry_loop(batch).await;
            shared.retries.done();
        });
    }

    /// Exponential-backoff retry of one batch, never split or reordered.
    /// Unbounded unless `max_retries` is configured; reclassifies every
    /// attempt, so a failure that turns fatal still ends the run.
    async fn retry_loop(&self, batch: Vec<Statement>) {
        let mut delay = BACKOFF_START;
        let mut attempts: u32 = 0;
        loop {
            tokio::time::sleep(delay).await;
            match self.commit_once(&batch).await {
                Attempt::Done | Attempt::Stop => return,
                Attempt::Retry(err) => {
                    attempts += 1;
                    if let Some(max) = self.opts.max_retries {
                        if attempts >= max {
                            error!(
                                attempts,
                                error = %err,
                                "batch exhausted its retry cap, aborting run"
                            );
                            self.record_fatal(LoadError::RetriesExhausted {
                                attempts,
                                error: err,
                            });
                            return;
                        }
                    }
                    delay = (delay * 2).min(BACKOFF_CAP);
                }
            }
        }
    }
}

/// Bulk loader: drives statements from a decoder into the mutation
/// cluster. One `load` call per loader; counters and the identifier
/// mapping live for the whole run.
pub struct Loader {
    client: Arc<dyn MutationClient>,
    xidmap: Arc<XidMap>,
    progress: Arc<Progress>,
    opts: BatchMutationOptions,
}

impl Loader {
    pub fn new(
        client: Arc<dyn MutationClient>,
        xidmap: Arc<XidMap>,
        opts: BatchMutationOptions,
    ) -> Self {
        Self {
            client,
            xidmap,
            progress: Arc::new(Progress::new()),
            opts,
        }
    }

    /// Current state of the run; safe to call concurrently with loading.
    pub fn counter(&self) -> Counter {
        self.progress.snapshot()
    }

    /// Rewrite a statement's subject and object reference to canonical
    /// internal-id form.
    async fn resolve(&self, st: Statement) -> Result<Statement> {
        let subject = self.xidmap.resolve(&st.subject).await?;
        let object = match st.object {
            ObjectValue::Ref(name) => ObjectValue::Ref(self.xidmap.resolve(&name).await?),
            literal => literal,
        };
        Ok(Statement {
            subject,
            predicate: st.predicate,
            object,
        })
    }

    /// Run the full load. Returns the final counter on success; on fatal
    /// errors the run drains in order before the error is surfaced.
    pub async fn load<R>(&self, mut reader: R, mut chunker: Box<dyn Chunker>) -> Result<Counter>
    where
        R: BufRead + Send,
    {
        let queue_cap = 2 * self.opts.concurrency;
        let (tx, rx) = mpsc::channel::<Vec<Statement>>(queue_cap);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let shared = Arc::new(Shared {
            client: Arc::clone(&self.client),
            progress: Arc::clone(&self.progress),
            opts: self.opts.clone(),
            dispatches: CompletionTracker::new(),
            retries: CompletionTracker::new(),
            fatal: Mutex::new(None),
        });

        debug!(
            workers = self.opts.concurrency,
            queue_cap, "phase: dispatching"
        );
        for _ in 0..self.opts.concurrency {
            shared.dispatches.add();
            let shared = Arc::clone(&shared);
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    let batch = rx.lock().await.recv().await;
                    let Some(batch) = batch else { break };
                    shared.submit(batch).await;
                    if shared.fatal_seen() {
                        break;
                    }
                }
                shared.dispatches.done();
            });
        }
        drop(rx);

        let produced = self.produce(&mut reader, chunker.as_mut(), tx).await;

        debug!("phase: draining worker pool");
        shared.dispatches.wait().await;

        // Only now is the retry pending-count final-able: no worker is
        // left to spawn new retry roots.
        debug!(pending = shared.retries.pending(), "phase: draining retries");
        shared.retries.wait().await;

        if let Some(fatal) = shared.take_fatal() {
            return Err(fatal);
        }
        produced?;

        // Mapping is persisted strictly after both trackers completed.
        self.xidmap.flush().await?;

        let counter = self.progress.snapshot();
        if self.opts.print_counters {
            info!(
                txns = counter.txns_done,
                nquads = counter.nquads,
                aborts = counter.aborts,
                elapsed_ms = counter.elapsed.as_millis() as u64,
                rate = counter.rate(),
                "load complete"
            );
        }
        debug!("phase: done");
        Ok(counter)
    }

    /// Producer: decode, resolve and accumulate until end of stream or
    /// cancellation. Closes the queue on exit by dropping the sender.
    async fn produce(
        &self,
        reader: &mut (dyn BufRead + Send),
        chunker: &mut dyn Chunker,
        tx: mpsc::Sender<Vec<Statement>>,
    ) -> Result<()> {
        let mut batcher = Batcher::new(self.opts.batch_size, tx);
        loop {
            if self.opts.cancel.is_cancelled() {
                return Err(LoadError::Cancelled);
            }
            let Some(chunk) = chunker.next_chunk(&mut *reader)? else {
                break;
            };
            let statements = chunker.parse(&chunk)?;
            let mut resolved = Vec::with_capacity(statements.len());
            for st in statements {
                resolved.push(self.resolve(st).await?);
            }
            batcher.push(resolved).await?;
        }
        chunker.finalize(&mut *reader)?;
        batcher.finish().await
    }
}
