//! Media models.
//!
//! [`FileHandle`] is an in-memory file (name, type, modification time and
//! bytes). [`MediaRecord`] is what gets persisted: the original bytes, a
//! derived preview and metadata. [`MediaItem`] is what callers get back when
//! reading: a reconstructed [`FileHandle`] plus the stored metadata.

use crate::error::{Error, ErrorKind};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use time::UtcDateTime;

/// Milliseconds since the Unix epoch, the unit every timestamp in a record uses.
pub fn now_millis() -> i64 {
    let millis = UtcDateTime::now().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}

/// Generate a fresh, opaque record identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[display("image")]
    Image,
    #[display("video")]
    Video,
}
impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Image, MediaKind::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Media type assumed when the stored blob carries none.
    pub fn default_mime_type(&self) -> &'static str {
        match self {
            Self::Image => "image/jpeg",
            Self::Video => "video/mp4",
        }
    }

    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let top = mime.split('/').next()?.trim();
        match top.to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// Guess the kind from a file name's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        crate::probe::mime_from_name(path.as_ref()).and_then(Self::from_mime_type)
    }
}
impl FromStr for MediaKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "images" => Ok(Self::Image),
            "video" | "videos" => Ok(Self::Video),
            other => exn::bail!(ErrorKind::UnsupportedMedia(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Metadata stored alongside the binary payloads.
///
/// `duration_seconds` is only ever populated for videos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub format: String,
}

/// The folder an item was imported from.
///
/// Path and name always travel together: an item either belongs to a folder
/// (both present) or is "loose" (neither).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderRef {
    pub path: String,
    pub name: String,
}
impl FolderRef {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into() }
    }

    /// Build a folder reference from its path, naming it after the last segment.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default().to_string();
        Self { path, name }
    }

    /// Rebuild from two nullable columns. Half-present pairs are rejected.
    pub fn from_parts(path: Option<String>, name: Option<String>) -> Result<Option<Self>, Error> {
        match (path, name) {
            (Some(path), Some(name)) => Ok(Some(Self { path, name })),
            (None, None) => Ok(None),
            _ => exn::bail!(ErrorKind::InvalidData("folder path and name must both be present or absent")),
        }
    }
}

/// An in-memory file: the unit callers hand in and get back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    /// Media type, if known (`image/png`, `video/mp4`, ...).
    pub mime_type: Option<String>,
    /// Epoch milliseconds of the source file's modification time.
    pub last_modified: i64,
    pub bytes: Vec<u8>,
}
impl FileHandle {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>, last_modified: i64) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            last_modified,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Determine the media type: the declared one, then magic bytes, then
    /// the file extension.
    pub fn resolved_mime_type(&self) -> Option<String> {
        self.mime_type
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| crate::probe::sniff_mime(&self.bytes).map(str::to_string))
            .or_else(|| crate::probe::mime_from_name(Path::new(&self.name)).map(str::to_string))
    }

    pub fn kind(&self) -> Option<MediaKind> {
        self.resolved_mime_type().as_deref().and_then(MediaKind::from_mime_type)
    }
}

/// One persisted media item.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRecord {
    pub id: String,
    pub name: String,
    pub kind: MediaKind,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    pub last_modified: i64,
    /// Full original file content. Empty means the record is corrupt.
    pub original: Vec<u8>,
    /// JPEG thumbnail; empty when none could be derived.
    pub preview: Vec<u8>,
    pub metadata: MediaMetadata,
    /// Reserved; always empty for now.
    pub tags: Vec<String>,
    pub added_at: i64,
    pub folder: Option<FolderRef>,
}
impl MediaRecord {
    pub fn is_corrupt(&self) -> bool {
        self.original.is_empty()
    }

    pub fn folder_path(&self) -> Option<&str> {
        self.folder.as_ref().map(|f| f.path.as_str())
    }
}

/// A record read back from the store, ready to use.
///
/// The [`FileHandle`] is an independent copy: dropping or mutating it never
/// affects what is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub id: String,
    pub kind: MediaKind,
    pub file: FileHandle,
    pub preview: Vec<u8>,
    pub metadata: MediaMetadata,
    pub tags: Vec<String>,
    pub added_at: i64,
    pub folder: Option<FolderRef>,
}
impl MediaItem {
    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn size(&self) -> u64 {
        self.file.size()
    }

    pub fn last_modified(&self) -> i64 {
        self.file.last_modified
    }

    pub fn folder_path(&self) -> Option<&str> {
        self.folder.as_ref().map(|f| f.path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("image/png", Some(MediaKind::Image))]
    #[case("IMAGE/JPEG", Some(MediaKind::Image))]
    #[case("video/quicktime", Some(MediaKind::Video))]
    #[case("application/pdf", None)]
    #[case("", None)]
    fn test_kind_from_mime(#[case] mime: &str, #[case] expected: Option<MediaKind>) {
        assert_eq!(MediaKind::from_mime_type(mime), expected);
    }

    #[rstest]
    #[case("image", MediaKind::Image)]
    #[case("Videos", MediaKind::Video)]
    fn test_kind_from_str(#[case] input: &str, #[case] expected: MediaKind) {
        assert_eq!(input.parse::<MediaKind>().unwrap(), expected);
    }

    #[test]
    fn test_kind_from_str_rejects_unknown() {
        let err = "audio".parse::<MediaKind>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedMedia(s) if s == "audio"));
    }

    #[test]
    fn test_folder_ref_from_path() {
        assert_eq!(FolderRef::from_path("Holidays/Trip"), FolderRef::new("Holidays/Trip", "Trip"));
        assert_eq!(FolderRef::from_path("Trip/"), FolderRef::new("Trip/", "Trip"));
    }

    #[test]
    fn test_folder_ref_from_parts_requires_both() {
        assert!(FolderRef::from_parts(None, None).unwrap().is_none());
        assert!(FolderRef::from_parts(Some("A".into()), Some("A".into())).unwrap().is_some());
        assert!(FolderRef::from_parts(Some("A".into()), None).is_err());
        assert!(FolderRef::from_parts(None, Some("A".into())).is_err());
    }

    #[test]
    fn test_metadata_json_shape() {
        let metadata = MediaMetadata {
            dimensions: Some(Dimensions { width: 4, height: 3 }),
            duration_seconds: None,
            format: "png".to_string(),
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"dimensions":{"width":4,"height":3},"format":"png"}"#);
        let back: MediaMetadata = serde_json::from_str(r#"{"durationSeconds":1.5}"#).unwrap();
        assert_eq!(back.duration_seconds, Some(1.5));
        assert_eq!(back.format, "");
    }

    #[test]
    fn test_file_handle_kind_uses_extension_as_fallback() {
        let file = FileHandle::new("clip.MP4", b"not really a video".to_vec(), 0);
        assert_eq!(file.kind(), Some(MediaKind::Video));
        let file = FileHandle::new("notes.txt", b"hello".to_vec(), 0);
        assert_eq!(file.kind(), None);
        let file = FileHandle::new("mystery", b"x".to_vec(), 0).with_mime_type("image/gif");
        assert_eq!(file.kind(), Some(MediaKind::Image));
    }
}
