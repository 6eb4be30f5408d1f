//! # Graft Loader
//!
//! The core of the graft bulk loader: takes the statement stream produced
//! by a decoder, resolves external names to internal ids, groups the
//! statements into bounded batches, fans them out across a worker pool,
//! and drives every batch through the remote mutation transport until it
//! commits.
//!
//! Design stance: a bulk load must eventually complete or be killed.
//! Transient failures are absorbed by an infinite-retry engine with
//! exponential backoff; only fatal classifications (broken or
//! misconfigured cluster) end the run early.
//!
//! ## Pipeline
//!
//! decoder → resolver → accumulator → bounded queue → worker pool →
//! mutation transport, with failed batches looping through the retry
//! engine.

pub mod batcher;
pub mod error;
pub mod loader;
pub mod options;
pub mod progress;
pub mod tracker;

pub use error::{LoadError, Result};
pub use loader::Loader;
pub use options::BatchMutationOptions;
pub use progress::{Counter, Progress};
pub use tracker::CompletionTracker;
