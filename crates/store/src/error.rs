//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The store was used before `init()` or after `close()`.
    #[display("store used before initialization")]
    NotInitialized,
    /// The database could not be opened, migrated, queried or a transaction
    /// could not be started. The gallery is non-functional until this clears.
    #[display("storage unavailable")]
    StorageUnavailable,
    #[display("database migration error")]
    Migration,
    /// A statement or commit inside a write transaction failed. The
    /// transaction was rolled back.
    #[display("transaction aborted")]
    Transaction,
    /// Every attempt of a batch write failed; nothing from the batch was
    /// persisted.
    #[display("batch write of {size} records failed after {attempts} attempts")]
    BatchWriteFailed { size: usize, attempts: u32 },
    /// A batch delete was rolled back. `id` names the record whose delete
    /// failed, or is `None` when the commit itself failed.
    #[display("batch delete of {size} records failed at {}", id.as_deref().unwrap_or("commit"))]
    BatchDeleteFailed { size: usize, id: Option<String> },
    /// Refused to write a record without original bytes.
    #[display("corrupt record: {_0}")]
    CorruptRecord(#[error(not(source))] String),
    /// A column could not be converted to or from its model representation.
    #[display("invalid stored data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transaction | Self::BatchWriteFailed { .. } | Self::BatchDeleteFailed { .. }
        )
    }
}
