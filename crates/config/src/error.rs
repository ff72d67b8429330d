//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A config error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration file named explicitly does not exist.
    #[display("config file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The layered configuration could not be parsed into [`Config`](crate::Config).
    #[display("could not load configuration")]
    Load,
    /// A value parsed but is out of range.
    #[display("invalid configuration value: {_0}")]
    Invalid(#[error(not(source))] &'static str),
    /// No path was configured and the platform has no data directory.
    #[display("no data directory available; set database.path explicitly")]
    NoDataDirectory,
}
