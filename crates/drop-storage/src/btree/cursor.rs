//! Cursor handle over a B-tree store
//!
//! Unlike the hash engine, the tree has a real cursor: it holds its own
//! position and walks keys in ascending order.

use drop_core::{CursorState, Result, StoreCursor};
use std::collections::btree_map::{BTreeMap, Iter};

/// Ordered cursor over the in-memory tree
pub struct BTreeCursor<'a> {
    tree: &'a BTreeMap<Vec<u8>, Vec<u8>>,
    iter: Option<Iter<'a, Vec<u8>, Vec<u8>>>,
    current: Option<(&'a Vec<u8>, &'a Vec<u8>)>,
    state: CursorState,
}

impl<'a> BTreeCursor<'a> {
    pub(crate) fn new(tree: &'a BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self {
            tree,
            iter: None,
            current: None,
            state: CursorState::Fresh,
        }
    }

    fn step(&mut self) -> bool {
        self.current = self.iter.as_mut().and_then(|it| it.next());
        self.state = CursorState::settle(self.current.is_some());
        self.current.is_some()
    }
}

impl StoreCursor for BTreeCursor<'_> {
    fn first(&mut self) -> Result<bool> {
        self.state.begin()?;
        self.iter = Some(self.tree.iter());
        Ok(self.step())
    }

    fn next(&mut self) -> Result<bool> {
        if !self.state.advance()? {
            return Ok(false);
        }
        Ok(self.step())
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.map(|(k, _)| k.as_slice())
    }

    fn value(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.current.map(|(_, v)| v.clone()))
    }
}
