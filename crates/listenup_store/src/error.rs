//! Error types for the entity stores.

use listenup_codec::CodecError;
use listenup_core::retry::{CancelReason, RetryError, Transient};
use listenup_core::CoreError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Stable classification of store failures for upper layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Record or index entry absent.
    NotFound,
    /// Primary key or unique index collision.
    AlreadyExists,
    /// Concurrent write interference.
    Conflict,
    /// Conflicts persisted past the attempt ceiling.
    RetryExhausted,
    /// Stored bytes failed to decode.
    Malformed,
    /// The caller cancelled or its deadline passed.
    Cancelled,
    /// The requested change breaks an entity rule.
    Invalid,
    /// Any other engine failure.
    Storage,
}

/// Errors returned by entity stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record or index entry does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Identifier that was looked up.
        key: String,
    },

    /// A record with the same primary key or unique attribute exists.
    #[error("{entity} already exists: {key}")]
    AlreadyExists {
        /// Entity kind.
        entity: &'static str,
        /// Colliding identifier or attribute.
        key: String,
    },

    /// A concurrent commit invalidated this operation's snapshot.
    #[error("concurrent write conflict on {key}")]
    Conflict {
        /// First conflicting key.
        key: String,
    },

    /// The operation kept conflicting until the attempt ceiling.
    #[error("operation still conflicting after {attempts} attempts")]
    RetryExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        source: Box<StoreError>,
    },

    /// A stored record failed to decode (or a value failed to encode).
    #[error("malformed {entity} record")]
    Malformed {
        /// Entity kind.
        entity: &'static str,
        /// Codec failure.
        #[source]
        source: CodecError,
    },

    /// The caller cancelled before the operation could finish.
    #[error("{reason}")]
    Cancelled {
        /// Cancellation or deadline.
        reason: CancelReason,
    },

    /// The change would break an entity rule.
    #[error("invalid change: {reason}")]
    Invalid {
        /// Rule that was broken.
        reason: String,
    },

    /// Engine failure other than a conflict.
    #[error("storage error: {0}")]
    Storage(#[source] CoreError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn malformed(entity: &'static str, source: CodecError) -> Self {
        Self::Malformed { entity, source }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Invalid { .. } => ErrorKind::Invalid,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns true for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true for `AlreadyExists`.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Conflict { key } => Self::Conflict { key },
            other => Self::Storage(other),
        }
    }
}

impl From<RetryError<StoreError>> for StoreError {
    fn from(e: RetryError<StoreError>) -> Self {
        match e {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted { attempts, last } => Self::RetryExhausted {
                attempts,
                source: Box::new(last),
            },
            RetryError::Cancelled(reason) => Self::Cancelled { reason },
        }
    }
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}
