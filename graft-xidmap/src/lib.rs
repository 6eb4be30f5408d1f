//! # Graft XidMap
//!
//! Maps externally-supplied node names to stable 64-bit internal
//! identifiers. The mapping is monotone: once a name has an id, it keeps
//! that id for the lifetime of the mapping.
//!
//! Allocation itself is an external capability ([`XidAllocator`], typically
//! a remote coordination service); this crate owns the resolution rules:
//!
//! - A name that parses as a radix-prefixed numeric literal is treated as a
//!   pre-existing internal id. The allocator is bumped strictly above it so
//!   future auto-assigned ids never collide, and the value passes through
//!   unchanged.
//! - Any other name is assigned an id (first use) or resolved to its
//!   existing one.
//!
//! Resolved ids are rendered in canonical `0x`-hex form.

pub mod error;
pub mod memory;

pub use error::{Result, XidError};
pub use memory::MemoryAllocator;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// File name of the persisted mapping inside the configured directory.
const MAPPING_FILE: &str = "xids.json";

/// Capability for assigning internal identifiers.
///
/// `assign` is idempotent per name: re-assigning a known name returns the
/// id it already has. `bump_to` reserves the numeric range up to and
/// including `value`, so later assignments are strictly greater.
#[async_trait]
pub trait XidAllocator: Debug + Send + Sync {
    async fn assign(&self, name: &str) -> Result<u64>;
    async fn bump_to(&self, value: u64) -> Result<()>;

    /// Persist any allocator-side state.
    async fn flush(&self) -> Result<()>;
}

/// Canonical rendering of an internal id.
pub fn fmt_uid(uid: u64) -> String {
    format!("{:#x}", uid)
}

/// Parse a numeric-literal node name the way the loader recognizes
/// pre-existing ids: `0x`/`0X` hex, `0o` octal, `0b` binary, or plain
/// decimal. Returns `None` for anything else; malformed numerics are
/// ordinary names, not errors.
pub fn parse_uid(name: &str) -> Option<u64> {
    let (radix, digits) = match name.get(..2) {
        Some("0x") | Some("0X") => (16, &name[2..]),
        Some("0o") | Some("0O") => (8, &name[2..]),
        Some("0b") | Some("0B") => (2, &name[2..]),
        _ => (10, name),
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Concurrent name → id resolver backed by an [`XidAllocator`].
///
/// Keeps an in-memory cache so repeated names hit the allocator once, and
/// optionally persists the cache to `<dir>/xids.json` across runs.
#[derive(Debug)]
pub struct XidMap {
    allocator: Arc<dyn XidAllocator>,
    cache: RwLock<FxHashMap<String, u64>>,
    /// When set, ignore numeric ids in the input and always assign fresh
    /// ones (still stable per name within the mapping).
    new_uids: bool,
    persist_dir: Option<PathBuf>,
}

impl XidMap {
    pub fn new(allocator: Arc<dyn XidAllocator>) -> Self {
        Self {
            allocator,
            cache: RwLock::new(FxHashMap::default()),
            new_uids: false,
            persist_dir: None,
        }
    }

    /// Ignore pre-existing numeric ids in the input and assign new ones.
    pub fn with_new_uids(mut self, new_uids: bool) -> Self {
        self.new_uids = new_uids;
        self
    }

    /// Load the persisted mapping from `dir` (if present) and write it back
    /// on [`XidMap::flush`].
    pub fn with_persistence(mut self, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(MAPPING_FILE);
        if path.exists() {
            let bytes = std::fs::read(&path)?;
            let loaded: FxHashMap<String, u64> = serde_json::from_slice(&bytes)?;
            self.cache = RwLock::new(loaded);
        }
        self.persist_dir = Some(dir);
        Ok(self)
    }

    /// Resolve an external name to the canonical form of its internal id.
    ///
    /// Idempotent per name for the lifetime of the mapping.
    pub async fn resolve(&self, name: &str) -> Result<String> {
        if !self.new_uids {
            if let Some(uid) = parse_uid(name) {
                self.allocator.bump_to(uid).await?;
                return Ok(fmt_uid(uid));
            }
        }

        if let Some(&uid) = self.cache.read().await.get(name) {
            return Ok(fmt_uid(uid));
        }

        // The allocator dedupes by name, so a racing resolve of the same
        // name gets the same id back; last insert is a no-op.
        let uid = self.allocator.assign(name).await?;
        self.cache.write().await.insert(name.to_string(), uid);
        Ok(fmt_uid(uid))
    }

    /// Number of cached name mappings.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Flush the allocator and, when configured, persist the mapping.
    ///
    /// Called by the orchestrator only after every batch (including
    /// retries) has completed.
    pub async fn flush(&self) -> Result<()> {
        self.allocator.flush().await?;
        if let Some(ref dir) = self.persist_dir {
            std::fs::create_dir_all(dir)?;
            let cache = self.cache.read().await;
            let bytes = serde_json::to_vec(&*cache)?;
            std::fs::write(dir.join(MAPPING_FILE), bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> XidMap {
        XidMap::new(Arc::new(MemoryAllocator::new()))
    }

    #[test]
    fn test_parse_uid_forms() {
        assert_eq!(parse_uid("0x64"), Some(0x64));
        assert_eq!(parse_uid("0X64"), Some(0x64));
        assert_eq!(parse_uid("0o17"), Some(0o17));
        assert_eq!(parse_uid("0b101"), Some(5));
        assert_eq!(parse_uid("123"), Some(123));
        assert_eq!(parse_uid("b.1"), None);
        assert_eq!(parse_uid("0x"), None);
        assert_eq!(parse_uid("0xzz"), None);
        assert_eq!(parse_uid(""), None);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let map = map();
        let a = map.resolve("b.1").await.unwrap();
        let b = map.resolve("b.1").await.unwrap();
        assert_eq!(a, b);

        let other = map.resolve("b.2").await.unwrap();
        assert_ne!(a, other);
    }

    #[tokio::test]
    async fn test_numeric_literal_passes_through_and_bumps() {
        let map = map();
        let hex = map.resolve("0x64").await.unwrap();
        assert_eq!(hex, "0x64");
        // Numeric literals do not populate the name cache.
        assert!(map.is_empty().await);

        // Every id assigned afterwards exceeds the bumped value.
        let assigned = map.resolve("fresh").await.unwrap();
        let uid = parse_uid(&assigned).unwrap();
        assert!(uid > 0x64);
    }

    #[tokio::test]
    async fn test_bump_after_assign_still_protects() {
        let map = map();
        let first = parse_uid(&map.resolve("a").await.unwrap()).unwrap();
        map.resolve("0xff").await.unwrap();
        let second = parse_uid(&map.resolve("b").await.unwrap()).unwrap();
        assert!(second > 0xff);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_new_uids_skips_numeric_fast_path() {
        let map = map().with_new_uids(true);
        let resolved = map.resolve("0x64").await.unwrap();
        // Assigned fresh instead of passed through.
        assert_ne!(resolved, "0x64");
        // Still stable per name.
        assert_eq!(map.resolve("0x64").await.unwrap(), resolved);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let alloc = Arc::new(MemoryAllocator::new());
        let map = XidMap::new(alloc.clone())
            .with_persistence(dir.path())
            .unwrap();
        let first = map.resolve("alice").await.unwrap();
        map.flush().await.unwrap();

        let reloaded = XidMap::new(alloc).with_persistence(dir.path()).unwrap();
        assert_eq!(reloaded.resolve("alice").await.unwrap(), first);
        assert_eq!(reloaded.len().await, 1);
    }
}
