//! B-tree engine - sorted in-memory tree persisted as a sorted table
//!
//! The tree is loaded from its table file on open. Mutations update the
//! tree and, unless the store runs with [`SyncMode::None`], rewrite the
//! table straight away: the new image goes to a temp sibling private to
//! this handle and is renamed over the database file, so readers never
//! see a half-written table. A mutation whose table never reached the
//! rename is rolled back in memory; once renamed, memory and disk agree.
//!
//! Exclusive access is held through a `<db>.lock` sidecar for the life
//! of the store.

pub mod cursor;
pub mod table;

use crate::file::{self, StoreLock};
use crate::{StoreConfig, SyncMode};
use drop_core::{validate_key, validate_value, ErrorCode, KvStore, Result, StoreCursor};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use cursor::BTreeCursor;
pub use table::{TableEntry, TableReader, TableWriter};

/// Suffix of the temporary table written before the rename
const TMP_SUFFIX: &str = ".tmp";

/// B-tree store backed by a sorted table file
pub struct BTreeStore {
    path: PathBuf,
    /// Where this handle writes the next table image
    tmp_path: PathBuf,
    _lock: Option<StoreLock>,
    config: StoreConfig,
    tree: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Tree differs from the table on disk
    dirty: bool,
    last_error: ErrorCode,
}

impl BTreeStore {
    /// Open or create a B-tree store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open or create a B-tree store with custom configuration
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = if config.lock {
            Some(StoreLock::acquire(&path)?)
        } else {
            None
        };

        let file = file::open_rw(&path)?;
        let mut tree = BTreeMap::new();
        if file.metadata()?.len() > 0 {
            let mut reader = TableReader::from_file(file)?;
            let mut iter = reader.iter();
            while let Some(entry) = iter.next_entry()? {
                tree.insert(entry.key, entry.value);
            }
        }

        debug!(path = %path.display(), keys = tree.len(), "opened btree store");

        Ok(Self {
            tmp_path: file::temp_path(&path, TMP_SUFFIX),
            path,
            _lock: lock,
            config,
            tree,
            dirty: false,
            last_error: ErrorCode::Success,
        })
    }

    /// Write the tree to disk if it has unsaved changes
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.write_table()?;
        self.dirty = false;
        debug!(path = %self.path.display(), keys = self.tree.len(), "flushed btree store");
        Ok(())
    }

    /// Write the table image and rename it into place.
    ///
    /// On error the database file is untouched.
    fn write_table(&self) -> Result<()> {
        let durable = self.config.sync_mode == SyncMode::Sync;
        if let Err(e) = TableWriter::write_all(&self.tmp_path, &self.tree, durable) {
            let _ = std::fs::remove_file(&self.tmp_path);
            return Err(e);
        }
        file::replace(&self.tmp_path, &self.path)
    }

    /// Apply one mutation, writing through unless sync is deferred.
    ///
    /// `value` of `None` removes the key. Returns the previous value.
    fn apply(&mut self, key: &[u8], value: Option<Vec<u8>>) -> Result<Option<Vec<u8>>> {
        let previous = match value {
            Some(v) => self.tree.insert(key.to_vec(), v),
            None => self.tree.remove(key),
        };
        self.dirty = true;

        if self.config.sync_mode == SyncMode::None {
            return Ok(previous);
        }

        if let Err(e) = self.flush() {
            match previous {
                Some(old) => {
                    self.tree.insert(key.to_vec(), old);
                }
                None => {
                    self.tree.remove(key);
                }
            }
            self.dirty = false;
            return Err(e);
        }
        Ok(previous)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;
        self.apply(key, Some(value.to_vec())).map(|_| ())
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.last_error = ErrorCode::from(e);
        }
        result
    }
}

impl KvStore for BTreeStore {
    fn backend(&self) -> &'static str {
        "btree"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn fetch(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let found = self.tree.get(key).cloned();
        if found.is_none() {
            self.last_error = ErrorCode::ItemNotFound;
        }
        Ok(found)
    }

    fn try_insert(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        if self.tree.contains_key(key) {
            self.last_error = ErrorCode::KeyExists;
            return Ok(false);
        }
        let result = self.put(key, value);
        self.track(result).map(|_| true)
    }

    fn store(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let result = self.put(key, value);
        self.track(result)
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        if !self.tree.contains_key(key) {
            self.last_error = ErrorCode::ItemNotFound;
            return Ok(false);
        }
        let result = self.apply(key, None);
        self.track(result).map(|_| true)
    }

    fn len(&self) -> usize {
        self.tree.len()
    }

    fn cursor(&mut self) -> Result<Box<dyn StoreCursor + '_>> {
        Ok(Box::new(BTreeCursor::new(&self.tree)))
    }

    fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    fn describe_error(&self, code: ErrorCode) -> String {
        let text = match code {
            ErrorCode::Success => "success",
            ErrorCode::ItemNotFound => "no record found",
            ErrorCode::KeyExists => "existing record",
            ErrorCode::FileOpen => "open error",
            ErrorCode::FileRead => "read error",
            ErrorCode::FileWrite => "write error",
            ErrorCode::FileLocked => "lock error",
            ErrorCode::Corrupted => "invalid meta data",
            ErrorCode::InvalidInput => "invalid argument",
            ErrorCode::InvalidOperation => "invalid operation",
        };
        text.to_string()
    }

    fn sync(&mut self) -> Result<()> {
        let result = self.flush().and_then(|_| file::sync_path(&self.path));
        self.track(result)
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        self.flush()?;
        file::sync_path(&self.path)?;
        debug!(path = %self.path.display(), "closed btree store");
        Ok(())
    }
}

impl Drop for BTreeStore {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.flush() {
                warn!(path = %self.path.display(), error = %e, "failed to flush btree store on drop");
            }
        }
    }
}
