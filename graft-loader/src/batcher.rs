//! Batch accumulation
//!
//! Groups the resolved statement stream into exact-size batches and pushes
//! them onto the bounded dispatch queue. The queue's capacity throttles
//! the producer against the worker pool; the final batch of a stream may
//! be smaller than the configured size.

use crate::error::{LoadError, Result};
use graft_core::Statement;
use tokio::sync::mpsc;

pub struct Batcher {
    buf: Vec<Statement>,
    batch_size: usize,
    tx: mpsc::Sender<Vec<Statement>>,
}

impl Batcher {
    pub fn new(batch_size: usize, tx: mpsc::Sender<Vec<Statement>>) -> Self {
        Self {
            buf: Vec::with_capacity(2 * batch_size),
            batch_size,
            tx,
        }
    }

    /// Append a chunk's statements, pushing every full batch that forms.
    /// Blocks when the queue is full (backpressure).
    pub async fn push(&mut self, statements: Vec<Statement>) -> Result<()> {
        self.buf.extend(statements);
        while self.buf.len() >= self.batch_size {
            let rest = self.buf.split_off(self.batch_size);
            let batch = std::mem::replace(&mut self.buf, rest);
            self.tx
                .send(batch)
                .await
                .map_err(|_| LoadError::QueueClosed)?;
        }
        Ok(())
    }

    /// Push the remaining partial batch, if any, and close the queue by
    /// dropping the sender.
    pub async fn finish(self) -> Result<()> {
        if !self.buf.is_empty() {
            self.tx
                .send(self.buf)
                .await
                .map_err(|_| LoadError::QueueClosed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(n: usize) -> Vec<Statement> {
        (0..n)
            .map(|i| Statement::literal(format!("s{i}"), "p", "v"))
            .collect()
    }

    #[tokio::test]
    async fn test_exact_batches_plus_remainder() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut batcher = Batcher::new(1000, tx);
        batcher.push(statements(2500)).await.unwrap();
        batcher.finish().await.unwrap();

        let mut sizes = Vec::new();
        while let Some(batch) = rx.recv().await {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, vec![1000, 1000, 500]);
    }

    #[tokio::test]
    async fn test_accumulates_across_small_chunks() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut batcher = Batcher::new(10, tx);
        for _ in 0..7 {
            batcher.push(statements(3)).await.unwrap();
        }
        batcher.finish().await.unwrap();

        let mut sizes = Vec::new();
        while let Some(batch) = rx.recv().await {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, vec![10, 10, 1]);
    }

    #[tokio::test]
    async fn test_statement_order_preserved_within_batches() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut batcher = Batcher::new(4, tx);
        batcher.push(statements(10)).await.unwrap();
        batcher.finish().await.unwrap();

        let mut seen = Vec::new();
        while let Some(batch) = rx.recv().await {
            seen.extend(batch.into_iter().map(|s| s.subject));
        }
        let expected: Vec<String> = (0..10).map(|i| format!("s{i}")).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_empty_input_emits_no_batches() {
        let (tx, mut rx) = mpsc::channel(16);
        let batcher = Batcher::new(10, tx);
        batcher.finish().await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
