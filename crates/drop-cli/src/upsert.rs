//! Conflict-aware insert
//!
//! A new value is inserted only if the key is free. When it is taken, the
//! user is asked before the old value is replaced:
//!
//! ```text
//! AttemptInsert ──ok──▶ Inserted
//!       │
//!    conflict ──▶ AwaitConfirmation ──y──▶ store ──▶ Overwritten
//!       │                   └──────other──▶ Declined
//!       └── error / key vanished ──▶ WriteFailed
//! ```

use crate::transfer::LineSource;
use drop_core::{normalize_key, KvStore};
use tracing::{debug, warn};

/// Prompt shown when the key already holds a value
pub const OVERWRITE_PROMPT: &str = "Overwrite? [y/N] ";

/// How an upsert ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The key was free and now holds the value
    Inserted,
    /// The user confirmed and the old value was replaced
    Overwritten,
    /// The user kept the old value
    Declined,
    /// The store refused the write; carries the engine's description
    WriteFailed(String),
}

/// Inserts `value` at `key`, asking through `confirm` before overwriting.
pub fn upsert(
    store: &mut dyn KvStore,
    key: &str,
    value: &str,
    confirm: &mut dyn LineSource,
) -> UpsertOutcome {
    let key = normalize_key(key).as_bytes();

    match store.try_insert(key, value.as_bytes()) {
        Ok(true) => return UpsertOutcome::Inserted,
        Ok(false) => {}
        Err(e) => {
            debug!(error = %e, "conditional insert failed");
            return UpsertOutcome::WriteFailed(store.describe_error(store.last_error()));
        }
    }

    // Keep the conflict's code; the fetch below may overwrite it.
    let conflict = store.last_error();
    match store.fetch(key) {
        Ok(Some(_)) => {}
        Ok(None) | Err(_) => return UpsertOutcome::WriteFailed(store.describe_error(conflict)),
    }

    let answer = match confirm.read_line(OVERWRITE_PROMPT) {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "could not read confirmation");
            None
        }
    };
    if !answer.is_some_and(|a| a.starts_with(['y', 'Y'])) {
        return UpsertOutcome::Declined;
    }

    match store.store(key, value.as_bytes()) {
        Ok(()) => UpsertOutcome::Overwritten,
        Err(e) => {
            debug!(error = %e, "overwrite failed");
            UpsertOutcome::WriteFailed(store.describe_error(store.last_error()))
        }
    }
}
