//! # Graft Client
//!
//! Remote capabilities consumed by the loader core:
//!
//! - [`MutationClient`] — commits a batch of statements as one atomic
//!   transaction against the mutation cluster, and applies schema
//!   alterations.
//! - [`HttpMutationClient`] — JSON-over-HTTP implementation with
//!   round-robin load balancing across endpoints, configured via
//!   [`HttpOptions`] and [`TlsOptions`].
//! - [`HttpAllocatorClient`] — HTTP implementation of the
//!   `graft_xidmap::XidAllocator` capability.
//!
//! Failures carry an [`ErrorCode`] and message; [`ClientError::classify`]
//! maps them onto the loader's four reaction classes.

pub mod error;
pub mod http;

pub use error::{ClientError, ErrorClass, ErrorCode, Result};
pub use http::{HttpAllocatorClient, HttpMutationClient, HttpOptions, TlsOptions};

use async_trait::async_trait;
use graft_core::Statement;
use std::fmt::Debug;

/// Transport that commits batches against the remote cluster.
///
/// `commit` executes the statements as a single commit-now transaction:
/// all-or-nothing. Implementations must support concurrent independent
/// transactions.
#[async_trait]
pub trait MutationClient: Debug + Send + Sync {
    async fn commit(&self, statements: &[Statement]) -> Result<()>;

    /// Apply a schema alteration. Used once, before loading begins.
    async fn alter(&self, schema: &str) -> Result<()>;
}
