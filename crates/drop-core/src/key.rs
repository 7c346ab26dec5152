//! Key normalization and input validation
//!
//! Every key passes through [`normalize_key`] before it reaches a store,
//! and every write is checked by [`validate_key`] / [`validate_value`].

use crate::error::{Error, Result};

/// Largest accepted key, in bytes
pub const MAX_KEY_SIZE: usize = 1024;

/// Largest accepted value, in bytes
pub const MAX_VALUE_SIZE: usize = 16 * 1024 * 1024;

/// Truncates a key at its first whitespace character.
///
/// Keys are single tokens: `"foo bar"` and `"foo"` name the same entry.
/// A key that starts with whitespace normalizes to the empty string,
/// which [`validate_key`] then rejects.
///
/// ```
/// use drop_core::normalize_key;
///
/// assert_eq!(normalize_key("foo bar"), "foo");
/// assert_eq!(normalize_key("alpha"), "alpha");
/// assert_eq!(normalize_key("tab\tsep"), "tab");
/// ```
pub fn normalize_key(key: &str) -> &str {
    match key.find(char::is_whitespace) {
        Some(end) => &key[..end],
        None => key,
    }
}

/// Validates a database key
///
/// # Errors
///
/// Returns `Error::InvalidInput` for empty or oversized keys
#[inline]
pub fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidInput("Key cannot be empty".to_string()));
    }

    if key.len() > MAX_KEY_SIZE {
        return Err(Error::InvalidInput(format!(
            "Key size {} exceeds maximum {}",
            key.len(),
            MAX_KEY_SIZE
        )));
    }

    Ok(())
}

/// Validates a database value
///
/// # Errors
///
/// Returns `Error::InvalidInput` for oversized values
#[inline]
pub fn validate_value(value: &[u8]) -> Result<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(Error::InvalidInput(format!(
            "Value size {} exceeds maximum {}",
            value.len(),
            MAX_VALUE_SIZE
        )));
    }

    Ok(())
}
