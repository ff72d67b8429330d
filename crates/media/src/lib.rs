//! Media model and binary codec.
//!
//! Everything the gallery persists about a single image or video lives in a
//! [`MediaRecord`]: the original bytes, a JPEG preview bounded to a small
//! maximum edge, and metadata (dimensions, duration, format). This crate owns
//! the conversion in both directions:
//!
//! - [`prepare`] / [`codec::encode`]: file handle → record blobs, deriving the
//!   preview with [`preview::derive`]. Never fails because of a bad preview.
//! - [`codec::decode`]: stored record → [`MediaItem`] with an independent
//!   [`FileHandle`]. Fails only for corrupt records (no original bytes).

pub mod codec;
pub mod error;
mod models;
mod prepare;
pub mod preview;
pub mod probe;

pub use crate::codec::{Payload, PreviewSource};
pub use crate::models::{
    Dimensions, FileHandle, FolderRef, MediaItem, MediaKind, MediaMetadata, MediaRecord, generate_id, now_millis,
};
pub use crate::prepare::prepare;
pub use crate::preview::PreviewOptions;
