//! Error types for the ListenUp engine.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification of engine failures.
///
/// Callers decide whether to retry from this kind, never from error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// A concurrent commit invalidated the transaction's snapshot.
    Conflict,
    /// Any other failure.
    Other,
}

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Log storage error.
    #[error("storage error: {0}")]
    Storage(#[from] listenup_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// WAL is corrupted or invalid.
    #[error("WAL corruption: {message}")]
    WalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected in the WAL.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the damaged record.
        offset: u64,
        /// Checksum stored in the record.
        expected: u32,
        /// Checksum computed over the record.
        actual: u32,
    },

    /// A key this transaction read, scanned or wrote was changed by a
    /// transaction that committed after this one's snapshot.
    #[error("transaction conflict on key {key}")]
    Conflict {
        /// The first conflicting key found.
        key: String,
    },

    /// Database is already open in another process.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,

    /// Database is closed.
    #[error("database is closed")]
    DatabaseClosed,

    /// Invalid database layout.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a WAL corruption error.
    pub fn wal_corruption(message: impl Into<String>) -> Self {
        Self::WalCorruption {
            message: message.into(),
        }
    }

    /// Creates a conflict error for a raw key.
    pub fn conflict(key: &[u8]) -> Self {
        Self::Conflict {
            key: String::from_utf8_lossy(key).replace('\0', "\\0"),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            Self::Conflict { .. } => EngineErrorKind::Conflict,
            _ => EngineErrorKind::Other,
        }
    }

    /// Returns true for commit conflicts.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == EngineErrorKind::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_classify_as_conflict() {
        assert_eq!(CoreError::conflict(b"user:1").kind(), EngineErrorKind::Conflict);
        assert_eq!(CoreError::DatabaseClosed.kind(), EngineErrorKind::Other);
        assert_eq!(
            CoreError::wal_corruption("database is locked").kind(),
            EngineErrorKind::Other
        );
    }

    #[test]
    fn conflict_key_is_printable() {
        let err = CoreError::conflict(b"email:a@b.c\0u1");
        assert_eq!(err.to_string(), "transaction conflict on key email:a@b.c\\0u1");
    }
}
