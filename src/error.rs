//! Command-line error types.

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("gallery unavailable")]
    Store,
    #[display("import failed")]
    Import,
    #[display("preferences unavailable")]
    Preferences,
    #[display("no media with id {_0}")]
    NotFound(#[error(not(source))] String),
    #[display("could not export to {}", _0.display())]
    Export(#[error(not(source))] PathBuf),
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
}
