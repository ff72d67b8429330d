//! Errors raised by storage backends.

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Nothing stored under this path. Preference loads treat this as "no
    /// preferences yet" rather than a failure.
    #[display("no such file: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("access denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O failure: {_0}")]
    Io(std::io::Error),
    /// Empty, escapes the backend root, or otherwise unusable as a key.
    #[display("invalid storage path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    #[display("storage backend failure: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Transient failures: an import may skip the file and carry on, a
    /// caller may try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::BackendError(_))
    }
}
