//! The uniform storage contract.
//!
//! Every engine implements [`KvStore`] and hands out cursors through
//! [`StoreCursor`]. Callers hold a `Box<dyn KvStore>` and never branch on
//! which engine sits behind it.

use crate::error::{Error, ErrorCode, Result};
use std::path::Path;

/// Key-value store contract implemented by every engine.
///
/// Keys and values are byte strings. Values are length-delimited, so any
/// byte (including NUL and newline) survives a round trip.
pub trait KvStore {
    /// Short engine name, e.g. `"hash"` or `"btree"`
    fn backend(&self) -> &'static str;

    /// Path of the database file backing this store
    fn path(&self) -> &Path;

    /// Point lookup. Returns `None` when the key is absent.
    fn fetch(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Inserts only if the key is absent.
    ///
    /// Returns `Ok(false)` when the key already exists; this is a conflict
    /// signal, not a failure, and the stored value is left untouched.
    fn try_insert(&mut self, key: &[u8], value: &[u8]) -> Result<bool>;

    /// Inserts or replaces the value for a key.
    fn store(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Removes a key. Returns `Ok(false)` when the key did not exist.
    fn delete(&mut self, key: &[u8]) -> Result<bool>;

    /// Number of live keys
    fn len(&self) -> usize;

    /// Returns true if the store holds no keys
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates a forward cursor over all keys.
    ///
    /// The cursor borrows the store, so the store cannot be mutated or
    /// closed while the cursor is alive. Dropping the cursor releases it.
    fn cursor(&mut self) -> Result<Box<dyn StoreCursor + '_>>;

    /// Code of the most recent failure or conflict
    fn last_error(&self) -> ErrorCode;

    /// Engine-specific wording for an error code
    fn describe_error(&self, code: ErrorCode) -> String {
        code.describe().to_string()
    }

    /// Forces pending writes to disk
    fn sync(&mut self) -> Result<()>;

    /// Flushes and releases the store.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Single-pass, forward-only cursor over a store's keys.
///
/// Call [`first`](StoreCursor::first) exactly once, then
/// [`next`](StoreCursor::next) until it returns `false`. Ordering is
/// whatever the engine provides natively.
pub trait StoreCursor {
    /// Positions on the first key. Returns `false` for an empty store.
    fn first(&mut self) -> Result<bool>;

    /// Advances to the next key. Returns `false` once iteration is done.
    fn next(&mut self) -> Result<bool>;

    /// Key at the current position, if positioned
    fn key(&self) -> Option<&[u8]>;

    /// Copy of the value at the current position, if positioned
    fn value(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Position bookkeeping shared by the engine cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorState {
    /// `first()` not called yet
    #[default]
    Fresh,
    /// On a key
    Positioned,
    /// Past the last key
    Exhausted,
}

impl CursorState {
    /// Checks that `first()` is allowed. Cursors cannot be restarted.
    pub fn begin(self) -> Result<()> {
        match self {
            CursorState::Fresh => Ok(()),
            _ => Err(Error::InvalidOperation(
                "cursor already started".to_string(),
            )),
        }
    }

    /// Checks that `next()` is allowed and whether there is anything left.
    ///
    /// Returns `Ok(false)` once exhausted.
    pub fn advance(self) -> Result<bool> {
        match self {
            CursorState::Fresh => Err(Error::InvalidOperation(
                "cursor advanced before first()".to_string(),
            )),
            CursorState::Positioned => Ok(true),
            CursorState::Exhausted => Ok(false),
        }
    }

    /// State after a positioning call that returned `found`
    pub fn settle(found: bool) -> Self {
        if found {
            CursorState::Positioned
        } else {
            CursorState::Exhausted
        }
    }
}

/// Adapts a [`StoreCursor`] into an [`Iterator`] of `(key, value)` pairs.
///
/// ```no_run
/// # fn demo(store: &mut dyn drop_core::KvStore) -> drop_core::Result<()> {
/// use drop_core::CursorIter;
///
/// for entry in CursorIter::new(store.cursor()?) {
///     let (key, value) = entry?;
///     println!("{}: {}", String::from_utf8_lossy(&key), value.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct CursorIter<'a> {
    cursor: Box<dyn StoreCursor + 'a>,
    started: bool,
    done: bool,
}

impl<'a> CursorIter<'a> {
    /// Wraps a fresh cursor
    pub fn new(cursor: Box<dyn StoreCursor + 'a>) -> Self {
        Self {
            cursor,
            started: false,
            done: false,
        }
    }

    fn step(&mut self) -> Result<bool> {
        if self.started {
            self.cursor.next()
        } else {
            self.started = true;
            self.cursor.first()
        }
    }
}

impl Iterator for CursorIter<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.step() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }

            let key = match self.cursor.key() {
                Some(k) => k.to_vec(),
                None => continue,
            };
            match self.cursor.value() {
                Ok(Some(value)) => return Some(Ok((key, value))),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
