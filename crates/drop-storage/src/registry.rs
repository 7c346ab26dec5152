//! Backend registry - picks an engine from the database file extension
//!
//! The extension map is static. Which engines can actually be opened
//! depends on the cargo features the crate was built with; a kind with
//! no opener registered fails with [`Error::BackendUnavailable`].

use crate::StoreConfig;
use drop_core::{Error, KvStore, Result};
use std::path::Path;
use tracing::debug;

/// Engine family behind a database file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Append-only log with a bucket hash index
    Hash,
    /// Sorted tree persisted as a sorted table
    BTree,
}

impl BackendKind {
    /// Engine name, matching [`KvStore::backend`]
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Hash => "hash",
            BackendKind::BTree => "btree",
        }
    }
}

/// One entry of the extension map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDescriptor {
    /// File extension without the dot
    pub extension: &'static str,
    /// Engine used for files with this extension
    pub kind: BackendKind,
}

/// Known extensions, in lookup order
pub const EXTENSION_MAP: &[BackendDescriptor] = &[
    BackendDescriptor {
        extension: "tcb",
        kind: BackendKind::BTree,
    },
    BackendDescriptor {
        extension: "dbm",
        kind: BackendKind::Hash,
    },
];

/// Engine used when the extension is missing or unknown
pub const DEFAULT_KIND: BackendKind = BackendKind::Hash;

/// Opens an engine at a path and erases its concrete type
pub type OpenFn = fn(&Path, &StoreConfig) -> Result<Box<dyn KvStore>>;

#[cfg(feature = "hash")]
fn open_hash(path: &Path, config: &StoreConfig) -> Result<Box<dyn KvStore>> {
    let store = crate::hash::HashStore::open_with_config(path, config.clone())?;
    Ok(Box::new(store))
}

#[cfg(feature = "btree")]
fn open_btree(path: &Path, config: &StoreConfig) -> Result<Box<dyn KvStore>> {
    let store = crate::btree::BTreeStore::open_with_config(path, config.clone())?;
    Ok(Box::new(store))
}

/// Maps backend kinds to the openers compiled into this build
pub struct BackendRegistry {
    openers: Vec<(BackendKind, OpenFn)>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "hash")]
        registry.register(BackendKind::Hash, open_hash);
        #[cfg(feature = "btree")]
        registry.register(BackendKind::BTree, open_btree);
        registry
    }
}

impl BackendRegistry {
    /// Registry with no engines
    pub fn empty() -> Self {
        Self {
            openers: Vec::new(),
        }
    }

    /// Registers (or replaces) the opener for a kind
    pub fn register(&mut self, kind: BackendKind, open: OpenFn) {
        match self.openers.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = open,
            None => self.openers.push((kind, open)),
        }
    }

    /// Kind for a path, by extension. Unknown or missing extensions map
    /// to the hash engine.
    pub fn kind_for(&self, path: &Path) -> BackendKind {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| EXTENSION_MAP.iter().find(|d| d.extension == ext))
            .map(|d| d.kind)
            .unwrap_or(DEFAULT_KIND)
    }

    /// Opener for a kind
    pub fn resolve(&self, kind: BackendKind) -> Result<OpenFn> {
        self.openers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, open)| *open)
            .ok_or_else(|| Error::BackendUnavailable(kind.name().to_string()))
    }

    /// Extensions listed in the map, whether or not their engine is built
    pub fn extensions(&self) -> impl Iterator<Item = &'static str> {
        EXTENSION_MAP.iter().map(|d| d.extension)
    }

    /// Returns true if `ext` (without the dot) is a mapped extension
    pub fn is_registered_extension(&self, ext: &str) -> bool {
        self.extensions().any(|e| e == ext)
    }

    /// Resolves the engine for `path` and opens it.
    ///
    /// Engine failures come back as [`Error::OpenFailed`]; a missing
    /// engine stays [`Error::BackendUnavailable`].
    pub fn open(&self, path: &Path, config: &StoreConfig) -> Result<Box<dyn KvStore>> {
        let kind = self.kind_for(path);
        let open = self.resolve(kind)?;
        debug!(path = %path.display(), backend = kind.name(), "opening database");

        open(path, config).map_err(|e| Error::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
