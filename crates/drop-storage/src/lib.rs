//! # drop storage engines
//!
//! File-backed key-value engines for the drop note store.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of drop.** Its API
//! may change without notice between minor versions.
//!
//! ---
//!
//! Two engines implement the [`drop_core::KvStore`] contract:
//!
//! - **Hash** (`.dbm`, feature `hash`): an append-only log of CRC-framed
//!   records indexed by an in-memory bucket table. Iteration is
//!   key-token based and unordered.
//! - **B-tree** (`.tcb`, feature `btree`): an in-memory B-tree persisted
//!   as a block-structured sorted table. Iteration uses a cursor handle
//!   and is sorted by key.
//!
//! The [`BackendRegistry`] picks an engine from the file extension.
//!
//! ## Architecture
//!
//! ```text
//! path ──▶ BackendRegistry::kind_for ──▶ opener ──▶ Box<dyn KvStore>
//!                                               ├── HashStore  (log + buckets)
//!                                               └── BTreeStore (tree + table)
//! ```

#[cfg(feature = "btree")]
pub mod btree;
mod file;
#[cfg(feature = "hash")]
pub mod hash;
pub mod record;
pub mod registry;

#[cfg(feature = "btree")]
pub use btree::BTreeStore;
#[cfg(feature = "hash")]
pub use hash::HashStore;
pub use record::{Record, RecordPayload, RecordType};
pub use registry::{BackendDescriptor, BackendKind, BackendRegistry, OpenFn, EXTENSION_MAP};

/// Default number of hash buckets for a new table
const DEFAULT_BUCKETS: usize = 64;

/// Dead bytes a hash log must accumulate before close reorganizes it (64KB)
const DEFAULT_REORGANIZE_MIN_BYTES: u64 = 64 * 1024;

/// Sync mode for engine writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Write through and fsync after every mutation (strongest durability)
    Sync,
    /// Write through and flush buffers, leave fsync to close
    Async,
    /// Defer writing to `sync()`/`close()` where the engine allows it
    None,
}

/// Engine configuration shared by both backends
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Durability of individual mutations
    pub sync_mode: SyncMode,
    /// Starting bucket count for the hash engine
    pub initial_buckets: usize,
    /// Minimum dead bytes before close reorganizes a hash log
    pub reorganize_min_bytes: u64,
    /// Take an exclusive advisory lock on the database file
    pub lock: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Sync,
            initial_buckets: DEFAULT_BUCKETS,
            reorganize_min_bytes: DEFAULT_REORGANIZE_MIN_BYTES,
            lock: true,
        }
    }
}
