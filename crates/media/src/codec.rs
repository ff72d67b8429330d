//! Binary object codec.
//!
//! Converts an in-memory [`FileHandle`] plus an optional preview into the two
//! blobs persisted in a [`MediaRecord`], and turns a stored record back into
//! an independent, ready-to-use [`MediaItem`].

use crate::error::{ErrorKind, Result};
use crate::models::{FileHandle, MediaItem, MediaRecord};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// The two blobs stored per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub original: Vec<u8>,
    /// Empty when no preview was supplied or it could not be decoded.
    pub preview: Vec<u8>,
}

/// Where a preview comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource<'a> {
    /// A `data:` URL, as produced by canvas-style thumbnailers and some
    /// remote listings.
    DataUrl(&'a str),
    /// Already-encoded JPEG bytes (see [`crate::preview::derive`]).
    Jpeg(Vec<u8>),
}

/// Produce the persisted blobs for `file`.
///
/// Never fails: a preview that cannot be decoded degrades to an empty blob.
pub fn encode(file: &FileHandle, preview: Option<PreviewSource<'_>>) -> Payload {
    let preview = match preview {
        None => Vec::new(),
        Some(PreviewSource::Jpeg(bytes)) => bytes,
        Some(PreviewSource::DataUrl(url)) => decode_data_url(url).unwrap_or_else(|| {
            tracing::debug!(name = %file.name, "Preview data URL could not be decoded; storing without preview");
            Vec::new()
        }),
    };
    Payload {
        original: file.bytes.clone(),
        preview,
    }
}

/// Rebuild a usable item from a stored record.
///
/// The media type defaults to the kind's default (`image/jpeg`/`video/mp4`)
/// when none was stored. Fails with [`ErrorKind::CorruptRecord`] when the
/// record has no original bytes; callers listing many records should skip
/// such records rather than fail.
pub fn decode(record: MediaRecord) -> Result<MediaItem> {
    if record.is_corrupt() {
        exn::bail!(ErrorKind::CorruptRecord(record.id));
    }
    let mime_type = record
        .mime_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| record.kind.default_mime_type().to_string());
    let file = FileHandle {
        name: record.name,
        mime_type: Some(mime_type),
        last_modified: record.last_modified,
        bytes: record.original,
    };
    Ok(MediaItem {
        id: record.id,
        kind: record.kind,
        file,
        preview: record.preview,
        metadata: record.metadata,
        tags: record.tags,
        added_at: record.added_at,
        folder: record.folder,
    })
}

/// Decode the payload of a `data:` URL.
///
/// Supports both `;base64` and plain payloads. Anything else (including
/// `http(s)` URLs, which would require fetching) yields `None`.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let rest = url.trim().strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let bytes = if header.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        // Data URLs sometimes get wrapped or padded with whitespace in transit.
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        BASE64.decode(compact).ok()?
    } else {
        data.as_bytes().to_vec()
    };
    (!bytes.is_empty()).then_some(bytes)
}

/// Encode bytes as a `data:` URL (used when handing previews to callers that
/// expect one).
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FolderRef, MediaKind, MediaMetadata};

    fn record(original: Vec<u8>, mime_type: Option<&str>, kind: MediaKind) -> MediaRecord {
        MediaRecord {
            id: "id-1".to_string(),
            name: "beach.jpg".to_string(),
            kind,
            mime_type: mime_type.map(str::to_string),
            size_bytes: original.len() as u64,
            last_modified: 1_700_000_000_000,
            original,
            preview: vec![1, 2, 3],
            metadata: MediaMetadata::default(),
            tags: vec![],
            added_at: 1_700_000_000_500,
            folder: Some(FolderRef::from_path("Trip")),
        }
    }

    #[test]
    fn test_encode_without_preview() {
        let file = FileHandle::new("a.png", vec![9u8; 32], 5);
        let payload = encode(&file, None);
        assert_eq!(payload.original, file.bytes);
        assert!(payload.preview.is_empty());
    }

    #[test]
    fn test_encode_with_data_url() {
        let file = FileHandle::new("a.png", vec![9u8; 4], 5);
        let url = to_data_url("image/jpeg", &[0xFF, 0xD8, 0xFF, 0xD9]);
        let payload = encode(&file, Some(PreviewSource::DataUrl(&url)));
        assert_eq!(payload.preview, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_degrades_on_bad_preview() {
        let file = FileHandle::new("a.png", vec![9u8; 4], 5);
        for bad in ["https://example.com/thumb.jpg", "data:image/jpeg;base64,!!!", "data:image/jpeg;base64,", "nonsense"] {
            let payload = encode(&file, Some(PreviewSource::DataUrl(bad)));
            assert!(payload.preview.is_empty(), "{bad} should degrade to an empty preview");
            assert_eq!(payload.original.len(), 4);
        }
    }

    #[test]
    fn test_plain_data_url() {
        assert_eq!(decode_data_url("data:text/plain,hi").unwrap(), b"hi");
    }

    #[test]
    fn test_decode_round_trip_preserves_identity() {
        let file = FileHandle::new("beach.jpg", vec![7u8; 128], 1_700_000_000_000);
        let payload = encode(&file, None);
        let item = decode(record(payload.original, None, MediaKind::Image)).unwrap();
        assert_eq!(item.file.bytes.len(), file.bytes.len());
        assert_eq!(item.file.name, file.name);
        assert_eq!(item.file.last_modified, file.last_modified);
        assert_eq!(item.folder_path(), Some("Trip"));
    }

    #[test]
    fn test_decode_defaults_mime_type() {
        let item = decode(record(vec![1], None, MediaKind::Video)).unwrap();
        assert_eq!(item.file.mime_type.as_deref(), Some("video/mp4"));
        let item = decode(record(vec![1], Some(""), MediaKind::Image)).unwrap();
        assert_eq!(item.file.mime_type.as_deref(), Some("image/jpeg"));
        let item = decode(record(vec![1], Some("image/png"), MediaKind::Image)).unwrap();
        assert_eq!(item.file.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_decode_rejects_corrupt_record() {
        let err = decode(record(Vec::new(), None, MediaKind::Image)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptRecord(id) if id == "id-1"));
    }
}
