//! Storage models.

use std::fs::Metadata;
use std::path::PathBuf;
use time::UtcDateTime;

/// File metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    pub modified: UtcDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: impl Into<UtcDateTime>) -> Self {
        Self {
            path: path.into(),
            size,
            modified: modified.into(),
        }
    }

    /// Build from filesystem metadata. An unavailable modification time
    /// reads as the Unix epoch.
    pub(crate) fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let modified = metadata.modified().map(UtcDateTime::from).unwrap_or(UtcDateTime::UNIX_EPOCH);
        Self::new(path, metadata.len(), modified)
    }

    /// Modification time in milliseconds since the Unix epoch.
    pub fn modified_millis(&self) -> i64 {
        i64::try_from(self.modified.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
    }

    /// File name without its directory, lossily converted to UTF-8.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
