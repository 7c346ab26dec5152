//! # drop
//!
//! Keep small notes and secrets under short keys, in a local key-value
//! database file.
//!
//! ```text
//! $ drop add github
//!    : ghp_0123456789
//! $ drop github
//! ghp_0123456789
//! ```
//!
//! The database engine is chosen from the file extension (`.dbm` hash
//! log, `.tcb` sorted B-tree); see [`drop_storage::BackendRegistry`].
//! This crate holds the command-line side: locating the database,
//! reading and writing values, the overwrite prompt and the commands
//! themselves.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod dispatch;
pub mod location;
pub mod logging;
pub mod transfer;
pub mod upsert;

pub use dispatch::{Channel, Dispatcher, Operation};
pub use location::Locator;
pub use transfer::{
    Console, LineSink, LineSource, PromptedValue, Selection, SelectionBuffer, SelectionTransfer,
    ValueSink, ValueSource, XSelection,
};
pub use upsert::{upsert, UpsertOutcome};
