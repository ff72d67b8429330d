//! Media Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A media error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A stored record has no original bytes. Skip it; never show it.
    #[display("corrupt record: {_0}")]
    CorruptRecord(#[error(not(source))] String),
    /// The file is neither an image nor a video we know how to store.
    #[display("unsupported media: {_0}")]
    UnsupportedMedia(#[error(not(source))] String),
    /// A media file with no content. Nothing can be stored for it.
    #[display("empty file: {_0}")]
    EmptyFile(#[error(not(source))] String),
    /// Decoding or re-encoding a preview image failed.
    #[display("preview generation failed")]
    Preview,
    /// A field could not be converted to or from its stored representation.
    #[display("invalid media data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Bytes are bytes: decoding the same input twice gives the same answer.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::CorruptRecord("abc".to_string()).to_string(), "corrupt record: abc");
        assert_eq!(ErrorKind::UnsupportedMedia("notes.txt".to_string()).to_string(), "unsupported media: notes.txt");
        assert_eq!(ErrorKind::InvalidData("metadata").to_string(), "invalid media data: metadata");
        assert_eq!(ErrorKind::EmptyFile("empty.jpg".to_string()).to_string(), "empty file: empty.jpg");
        assert!(!ErrorKind::Preview.is_retryable());
    }
}
