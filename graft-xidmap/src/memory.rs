//! In-memory allocator
//!
//! Process-local [`XidAllocator`] used by tests and single-run loads that
//! have no coordination service to talk to. Ids start at 1; 0 is reserved.

use crate::{Result, XidAllocator};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
pub struct MemoryAllocator {
    /// Next id to hand out.
    next: AtomicU64,
    names: Mutex<FxHashMap<String, u64>>,
}

impl MemoryAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            names: Mutex::new(FxHashMap::default()),
        }
    }

    /// Highest id reserved so far (assigned or bumped).
    pub fn high_water(&self) -> u64 {
        self.next.load(Ordering::SeqCst).saturating_sub(1)
    }
}

impl Default for MemoryAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl XidAllocator for MemoryAllocator {
    async fn assign(&self, name: &str) -> Result<u64> {
        let mut names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&uid) = names.get(name) {
            return Ok(uid);
        }
        let uid = self.next.fetch_add(1, Ordering::SeqCst);
        names.insert(name.to_string(), uid);
        Ok(uid)
    }

    async fn bump_to(&self, value: u64) -> Result<()> {
        // Monotone max: never lower the counter, regardless of the order
        // bumps and assignments interleave.
        self.next
            .fetch_max(value.saturating_add(1), Ordering::SeqCst);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assign_is_stable() {
        let alloc = MemoryAllocator::new();
        let a = alloc.assign("x").await.unwrap();
        assert_eq!(alloc.assign("x").await.unwrap(), a);
        assert_ne!(alloc.assign("y").await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_bump_reserves_range() {
        let alloc = MemoryAllocator::new();
        alloc.bump_to(100).await.unwrap();
        assert!(alloc.assign("x").await.unwrap() > 100);

        // Bumping below the current counter is a no-op.
        alloc.bump_to(5).await.unwrap();
        assert!(alloc.assign("y").await.unwrap() > 100);
    }
}
