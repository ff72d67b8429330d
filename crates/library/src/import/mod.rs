//! Folder import.
//!
//! Walks a [storage backend](shoebox_storage) and turns every image or video
//! it finds into a [`MediaRecord`](shoebox_media::MediaRecord): the file is
//! read, classified, given a preview and metadata (off the async runtime,
//! decoding images is CPU bound) and then written to the
//! [`MediaStore`](shoebox_store::MediaStore) in batches through
//! [`put_batch`](shoebox_store::MediaStore::put_batch).
//!
//! The primary entry point is [`import`], which streams [`ImportEvent`]s so
//! callers can report progress. Non-media files are skipped, not failed.

pub mod error;
mod file;
mod stream;

pub use self::file::folder_for;
pub use self::stream::{ImportEvent, import};
use serde::Serialize;
use shoebox_media::PreviewOptions;
use std::path::PathBuf;

/// Default number of records per [`put_batch`](shoebox_store::MediaStore::put_batch).
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Only import files under this path of the source backend.
    pub prefix: Option<PathBuf>,
    /// Folder name to file items under. Subdirectories of the source become
    /// nested folders (`Trip/day2`). `None` imports loose items.
    pub folder: Option<String>,
    pub batch_size: usize,
    pub preview: PreviewOptions,
}
impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            folder: None,
            batch_size: DEFAULT_BATCH_SIZE,
            preview: PreviewOptions::default(),
        }
    }
}

/// Totals reported once an import finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub discovered: u64,
    pub imported: u64,
    pub skipped: u64,
    pub failed: u64,
}
