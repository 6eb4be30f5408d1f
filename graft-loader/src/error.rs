//! Loader error types

use graft_client::ClientError;

/// Errors that abort a load run.
///
/// Transient mutation failures never appear here; they are absorbed by the
/// retry engine. A mutation error only surfaces once it is classified as
/// fatal (or a configured retry cap runs out).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The caller's cancellation signal fired.
    #[error("load cancelled")]
    Cancelled,

    /// Decode error from the statement stream; surfaced unmodified.
    #[error(transparent)]
    Chunk(#[from] graft_chunk::ChunkError),

    /// Identifier resolution or mapping persistence failed.
    #[error(transparent)]
    Xid(#[from] graft_xidmap::XidError),

    /// Fatal mutation failure; the remote cluster is broken or
    /// misconfigured and the run stops immediately.
    #[error("fatal mutation error: {0}")]
    Fatal(ClientError),

    /// A batch exhausted the configured retry cap.
    #[error("batch gave up after {attempts} retries: {error}")]
    RetriesExhausted { attempts: u32, error: ClientError },

    /// The dispatch queue closed while the producer was still running.
    /// Only happens after a fatal error tore the worker pool down.
    #[error("dispatch queue closed")]
    QueueClosed,
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoadError>;
