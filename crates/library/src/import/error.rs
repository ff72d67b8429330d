//! Error types for the [`import`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.

use derive_more::{Display, Error};

/// An import error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an import failure.
///
/// ### Per-file Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Prepare`]
///
/// ### Fatal Errors
/// - [`ErrorKind::Discovery`]
/// - [`ErrorKind::Store`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Listing the source backend failed; nothing was imported.
    #[display("could not list import source")]
    Discovery,
    /// Reading one source file failed.
    #[display("could not read source file")]
    Storage,
    /// Turning one source file into a record failed.
    #[display("could not prepare record")]
    Prepare,
    /// Writing a batch to the media store failed after its retries.
    #[display("could not write batch to store")]
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Store)
    }
}
