//! # drop core
//!
//! Core types for the drop note store: the error model, the uniform
//! storage contract every engine implements, key normalization and the
//! on-disk format constants shared by the engines.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! Users should run the `drop` binary from the `drop-cli` crate. This
//! crate's API may change without notice between minor versions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format_version;
pub mod key;
pub mod store;

pub use error::{Error, ErrorCode, Result};
pub use key::{normalize_key, validate_key, validate_value};
pub use store::{CursorIter, CursorState, KvStore, StoreCursor};
