//! Test doubles for the loader pipeline: a scriptable in-memory mutation
//! transport.

use async_trait::async_trait;
use graft_client::{ClientError, ErrorCode, MutationClient, Result};
use graft_core::Statement;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory mutation transport. Failures are scripted per batch, keyed by
/// the subject of the batch's first statement, and consumed one per commit
/// attempt; once a batch's script is empty its commits succeed.
#[derive(Debug, Default)]
pub struct FakeMutationClient {
    committed: Mutex<Vec<Vec<Statement>>>,
    scripts: Mutex<HashMap<String, VecDeque<ClientError>>>,
    /// Error returned by every attempt, overriding scripts.
    always_fail: Mutex<Option<ClientError>>,
    attempts: AtomicUsize,
}

impl FakeMutationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `errors.len()` commit attempts for the batch whose
    /// first statement has `subject`.
    pub fn script_failures(&self, subject: &str, errors: Vec<ClientError>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(subject.to_string(), errors.into());
    }

    pub fn fail_always(&self, error: ClientError) {
        *self.always_fail.lock().unwrap() = Some(error);
    }

    pub fn committed(&self) -> Vec<Vec<Statement>> {
        self.committed.lock().unwrap().clone()
    }

    pub fn committed_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.committed().iter().map(|b| b.len()).collect();
        sizes.sort_unstable();
        sizes
    }

    /// Total commit attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

pub fn conflict() -> ClientError {
    ClientError::new(ErrorCode::Conflict, "conflicting write")
}

pub fn aborted() -> ClientError {
    ClientError::new(ErrorCode::Aborted, "txn aborted")
}

pub fn internal() -> ClientError {
    ClientError::new(ErrorCode::Internal, "server fault")
}

pub fn unknown() -> ClientError {
    ClientError::new(ErrorCode::Unknown, "something odd")
}

pub fn overloaded() -> ClientError {
    ClientError::new(ErrorCode::ResourceExhausted, "Server overloaded.")
}

#[async_trait]
impl MutationClient for FakeMutationClient {
    async fn commit(&self, statements: &[Statement]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.always_fail.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(first) = statements.first() {
            let mut scripts = self.scripts.lock().unwrap();
            if let Some(queue) = scripts.get_mut(&first.subject) {
                if let Some(err) = queue.pop_front() {
                    return Err(err);
                }
            }
        }
        self.committed.lock().unwrap().push(statements.to_vec());
        Ok(())
    }

    async fn alter(&self, _schema: &str) -> Result<()> {
        Ok(())
    }
}
