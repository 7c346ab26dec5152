//! Error types for drop.

use std::fmt;
use std::path::PathBuf;

/// The main error type for drop operations.
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Serialization/deserialization error
    Serialization(String),

    /// On-disk data failed validation (bad magic, CRC mismatch)
    Corruption(String),

    /// Storage engine error
    Storage(String),

    /// Rejected key or value
    InvalidInput(String),

    /// Invalid operation
    InvalidOperation(String),

    /// Another handle holds the database lock
    Locked(PathBuf),

    /// The database could not be opened or created
    OpenFailed {
        /// Database file that failed to open
        path: PathBuf,
        /// Underlying cause, already rendered
        reason: String,
    },

    /// No engine is available for the selected backend
    BackendUnavailable(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Corruption(msg) => write!(f, "Corruption: {}", msg),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::Locked(path) => write!(f, "Database is locked: {}", path.display()),
            Error::OpenFailed { path, reason } => {
                write!(f, "Could not open database: {}: {}", path.display(), reason)
            }
            Error::BackendUnavailable(name) => {
                write!(f, "Could not load database support: {}", name)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// A specialized `Result` type for drop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errno-style code for the most recent failure on a store.
///
/// Stores record one of these whenever an operation fails or reports a
/// conflict, so callers can build a diagnostic after the fact. Codes are
/// for messages only; control flow goes through return values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCode {
    /// No error recorded
    #[default]
    Success,
    /// Key is not present
    ItemNotFound,
    /// Conditional insert hit an existing key
    KeyExists,
    /// File could not be opened or created
    FileOpen,
    /// Read from the database file failed
    FileRead,
    /// Write to the database file failed
    FileWrite,
    /// Database lock is held elsewhere
    FileLocked,
    /// Stored data failed validation
    Corrupted,
    /// Key or value was rejected
    InvalidInput,
    /// Operation not allowed in the current state
    InvalidOperation,
}

impl ErrorCode {
    /// Generic description used when a backend has no wording of its own.
    pub fn describe(self) -> &'static str {
        match self {
            ErrorCode::Success => "No error",
            ErrorCode::ItemNotFound => "Item not found",
            ErrorCode::KeyExists => "Key already exists",
            ErrorCode::FileOpen => "File open error",
            ErrorCode::FileRead => "File read error",
            ErrorCode::FileWrite => "File write error",
            ErrorCode::FileLocked => "Database is locked",
            ErrorCode::Corrupted => "Database is corrupted",
            ErrorCode::InvalidInput => "Illegal data",
            ErrorCode::InvalidOperation => "Invalid operation",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl From<&Error> for ErrorCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => ErrorCode::FileRead,
            Error::Io(_) | Error::Storage(_) => ErrorCode::FileWrite,
            Error::Serialization(_) | Error::Corruption(_) => ErrorCode::Corrupted,
            Error::InvalidInput(_) => ErrorCode::InvalidInput,
            Error::InvalidOperation(_) => ErrorCode::InvalidOperation,
            Error::Locked(_) => ErrorCode::FileLocked,
            Error::OpenFailed { .. } | Error::BackendUnavailable(_) => ErrorCode::FileOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failed_display() {
        let err = Error::OpenFailed {
            path: PathBuf::from("/nope/drop.dbm"),
            reason: "No such file or directory".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not open database: /nope/drop.dbm: No such file or directory"
        );
    }

    #[test]
    fn test_error_code_from_error() {
        assert_eq!(
            ErrorCode::from(&Error::Storage("disk full".into())),
            ErrorCode::FileWrite
        );
        assert_eq!(
            ErrorCode::from(&Error::Locked(PathBuf::from("x"))),
            ErrorCode::FileLocked
        );
        assert_eq!(
            ErrorCode::from(&Error::Corruption("crc".into())),
            ErrorCode::Corrupted
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(ErrorCode::from(&Error::Io(io)), ErrorCode::FileWrite);
    }

    #[test]
    fn test_error_code_default_is_success() {
        assert_eq!(ErrorCode::default(), ErrorCode::Success);
        assert_eq!(ErrorCode::Success.to_string(), "No error");
    }

    #[test]
    fn test_io_source() {
        use std::error::Error as _;
        let err = Error::from(std::io::Error::other("boom"));
        assert!(err.source().is_some());
        assert!(Error::Locked(PathBuf::from("x")).source().is_none());
    }
}
