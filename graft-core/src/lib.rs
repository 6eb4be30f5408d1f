//! # Graft Core
//!
//! Shared data model for the graft bulk loader: the `Statement` record that
//! flows from the decoder, through identifier resolution and batching, to
//! the remote mutation service.

pub mod statement;

pub use statement::{ObjectValue, Statement};
