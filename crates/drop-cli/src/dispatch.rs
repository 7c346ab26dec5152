//! Command dispatch
//!
//! Runs one [`Operation`] against an open store. Store outcomes (a
//! missing key, a declined overwrite, a failed write or read) are reported
//! on the error stream and do not fail the command; only a broken output
//! stream does.

use crate::transfer::{
    LineSink, LineSource, PromptedValue, Selection, SelectionBuffer, SelectionTransfer, ValueSink,
    ValueSource,
};
use crate::upsert::{upsert, UpsertOutcome};
use drop_core::{normalize_key, KvStore, Result};
use std::fmt::Display;
use std::io::Write;
use tracing::{debug, info};

/// Minimum key column width in a full listing
pub const FULL_LIST_KEY_WIDTH: usize = 10;

/// Where a value is read from or written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// stdin / stdout
    Console,
    /// An X selection buffer
    Selection(Selection),
}

/// One command-line action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Insert a value, confirming before overwrite
    Add {
        /// Raw key as typed
        key: String,
        /// Source of the value
        channel: Channel,
    },
    /// Remove a key
    Delete {
        /// Raw key as typed
        key: String,
    },
    /// Show the value for a key; no key means nothing to do
    Print {
        /// Raw key as typed
        key: Option<String>,
        /// Destination of the value
        channel: Channel,
    },
    /// Keys only
    List,
    /// Keys with their values
    FullList,
}

/// Executes operations against one store
pub struct Dispatcher<'a> {
    store: &'a mut dyn KvStore,
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
    lines: &'a mut dyn LineSource,
    selections: &'a mut dyn SelectionBuffer,
}

impl<'a> Dispatcher<'a> {
    /// Wires a store to its input and output streams
    pub fn new(
        store: &'a mut dyn KvStore,
        out: &'a mut dyn Write,
        err: &'a mut dyn Write,
        lines: &'a mut dyn LineSource,
        selections: &'a mut dyn SelectionBuffer,
    ) -> Self {
        Self {
            store,
            out,
            err,
            lines,
            selections,
        }
    }

    /// Runs one operation
    pub fn run(&mut self, operation: Operation) -> Result<()> {
        debug!(?operation, backend = self.store.backend(), "dispatching");
        match operation {
            Operation::Add { key, channel } => self.add(&key, channel),
            Operation::Delete { key } => self.delete(&key),
            Operation::Print { key: None, .. } => Ok(()),
            Operation::Print {
                key: Some(key),
                channel,
            } => self.print(&key, channel),
            Operation::List => self.list(false),
            Operation::FullList => self.list(true),
        }
    }

    fn add(&mut self, key: &str, channel: Channel) -> Result<()> {
        let key = normalize_key(key);

        let value = match channel {
            Channel::Console => PromptedValue::new(&mut *self.lines).read(),
            Channel::Selection(selection) => {
                SelectionTransfer::new(&mut *self.selections, selection).read()
            }
        };
        let value = match value {
            Ok(Some(value)) => value,
            Ok(None) => {
                info!(key, "no value supplied, nothing stored");
                return Ok(());
            }
            Err(e) => {
                writeln!(self.err, "{}", e)?;
                return Ok(());
            }
        };

        match upsert(&mut *self.store, key, &value, &mut *self.lines) {
            UpsertOutcome::WriteFailed(desc) => writeln!(self.err, "Could not write: {}", desc)?,
            outcome => debug!(key, ?outcome, "add finished"),
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let key = normalize_key(key);
        let deleted = self.store.delete(key.as_bytes()).unwrap_or_else(|e| {
            debug!(key, error = %e, "delete failed");
            false
        });
        if !deleted {
            let desc = self.store.describe_error(self.store.last_error());
            writeln!(self.err, "Could not delete '{}': {}", key, desc)?;
        }
        Ok(())
    }

    fn print(&mut self, key: &str, channel: Channel) -> Result<()> {
        let key = normalize_key(key);
        let value = match self.store.fetch(key.as_bytes()) {
            Ok(Some(value)) => value,
            Ok(None) => {
                writeln!(self.err, "'{}' does not exist.", key)?;
                return Ok(());
            }
            Err(e) => {
                writeln!(self.err, "Could not read '{}': {}", key, e)?;
                return Ok(());
            }
        };
        match channel {
            Channel::Console => LineSink::new(&mut *self.out).write(&value),
            Channel::Selection(selection) => {
                if let Err(e) = SelectionTransfer::new(&mut *self.selections, selection).write(&value)
                {
                    writeln!(self.err, "{}", e)?;
                }
                Ok(())
            }
        }
    }

    fn list(&mut self, with_values: bool) -> Result<()> {
        let mut cursor = match self.store.cursor() {
            Ok(cursor) => cursor,
            Err(e) => return list_failed(&mut *self.err, e),
        };
        match cursor.first() {
            Ok(true) => {}
            Ok(false) => {
                writeln!(self.out, "Database is empty.")?;
                return Ok(());
            }
            Err(e) => return list_failed(&mut *self.err, e),
        }

        loop {
            if let Some(key) = cursor.key() {
                let key = key.to_vec();
                self.out.write_all(&key)?;
                if with_values {
                    match cursor.value() {
                        Ok(Some(value)) => {
                            self.out.write_all(b": ")?;
                            let pad = FULL_LIST_KEY_WIDTH.saturating_sub(key.len());
                            write!(self.out, "{:pad$}", "", pad = pad)?;
                            self.out.write_all(&value)?;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            self.out.write_all(b"\n")?;
                            self.out.flush()?;
                            return list_failed(&mut *self.err, e);
                        }
                    }
                }
                self.out.write_all(b"\n")?;
            }
            match cursor.next() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    self.out.flush()?;
                    return list_failed(&mut *self.err, e);
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Reports a listing cut short by the store
fn list_failed(err: &mut dyn Write, e: impl Display) -> Result<()> {
    debug!(error = %e, "listing failed");
    writeln!(err, "Could not list database: {}", e)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drop_core::{Error, ErrorCode, StoreCursor};
    use std::path::Path;

    struct NoLines;

    impl LineSource for NoLines {
        fn read_line(&mut self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    struct NoSelection;

    impl SelectionBuffer for NoSelection {
        fn read(&mut self, _: Selection) -> Result<Option<String>> {
            Ok(None)
        }
        fn write(&mut self, _: Selection, _: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Store whose writes fail and whose listing breaks after `k1`
    struct FailingStore {
        cursor_fails: bool,
        last_error: ErrorCode,
    }

    struct BreakingCursor {
        started: bool,
    }

    impl StoreCursor for BreakingCursor {
        fn first(&mut self) -> Result<bool> {
            self.started = true;
            Ok(true)
        }
        fn next(&mut self) -> Result<bool> {
            Err(Error::Corruption("bad bucket".to_string()))
        }
        fn key(&self) -> Option<&[u8]> {
            self.started.then_some(&b"k1"[..])
        }
        fn value(&mut self) -> Result<Option<Vec<u8>>> {
            Ok(Some(b"v1".to_vec()))
        }
    }

    impl KvStore for FailingStore {
        fn backend(&self) -> &'static str {
            "failing"
        }
        fn path(&self) -> &Path {
            Path::new("failing")
        }
        fn fetch(&mut self, _: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(Some(vec![0xff, b'x', 0x00]))
        }
        fn try_insert(&mut self, _: &[u8], _: &[u8]) -> Result<bool> {
            self.last_error = ErrorCode::FileWrite;
            Err(Error::Storage("disk full".to_string()))
        }
        fn store(&mut self, _: &[u8], _: &[u8]) -> Result<()> {
            self.last_error = ErrorCode::FileWrite;
            Err(Error::Storage("disk full".to_string()))
        }
        fn delete(&mut self, _: &[u8]) -> Result<bool> {
            self.last_error = ErrorCode::FileWrite;
            Err(Error::Storage("disk full".to_string()))
        }
        fn len(&self) -> usize {
            1
        }
        fn cursor(&mut self) -> Result<Box<dyn StoreCursor + '_>> {
            if self.cursor_fails {
                return Err(Error::Corruption("no index".to_string()));
            }
            Ok(Box::new(BreakingCursor { started: false }))
        }
        fn last_error(&self) -> ErrorCode {
            self.last_error
        }
        fn sync(&mut self) -> Result<()> {
            Ok(())
        }
        fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn run_on(store: &mut dyn KvStore, operation: Operation) -> (Result<()>, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result =
            Dispatcher::new(store, &mut out, &mut err, &mut NoLines, &mut NoSelection).run(operation);
        (
            result,
            String::from_utf8_lossy(&out).into_owned(),
            String::from_utf8_lossy(&err).into_owned(),
        )
    }

    fn failing() -> FailingStore {
        FailingStore {
            cursor_fails: false,
            last_error: ErrorCode::Success,
        }
    }

    #[test]
    fn test_print_without_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = drop_storage::BackendRegistry::default()
            .open(&dir.path().join("drop.dbm"), &Default::default())
            .unwrap();

        let (result, out, err) = run_on(
            store.as_mut(),
            Operation::Print {
                key: None,
                channel: Channel::Console,
            },
        );

        assert!(result.is_ok());
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn test_failed_delete_is_reported() {
        let mut store = failing();
        let (result, out, err) = run_on(&mut store, Operation::Delete { key: "k".to_string() });

        assert!(result.is_ok());
        assert!(out.is_empty());
        assert_eq!(err, "Could not delete 'k': File write error\n");
    }

    #[test]
    fn test_list_cut_short_is_reported() {
        let mut store = failing();
        let (result, out, err) = run_on(&mut store, Operation::FullList);

        assert!(result.is_ok());
        assert_eq!(out, "k1:         v1\n");
        assert_eq!(err, "Could not list database: Corruption: bad bucket\n");
    }

    #[test]
    fn test_list_without_cursor_is_reported() {
        let mut store = FailingStore {
            cursor_fails: true,
            last_error: ErrorCode::Success,
        };
        let (result, out, err) = run_on(&mut store, Operation::List);

        assert!(result.is_ok());
        assert!(out.is_empty());
        assert_eq!(err, "Could not list database: Corruption: no index\n");
    }

    #[test]
    fn test_print_writes_raw_bytes() {
        let mut store = failing();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        Dispatcher::new(&mut store, &mut out, &mut err, &mut NoLines, &mut NoSelection)
            .run(Operation::Print {
                key: Some("bin".to_string()),
                channel: Channel::Console,
            })
            .unwrap();

        assert_eq!(out, [0xff, b'x', 0x00, b'\n']);
        assert!(err.is_empty());
    }
}
