use crate::codec::{PreviewSource, encode};
use crate::error::{ErrorKind, Result};
use crate::models::{FileHandle, FolderRef, MediaRecord, generate_id, now_millis};
use crate::preview::{PreviewOptions, derive};

/// Turn a raw file into a record ready for the store.
///
/// Classifies the file, derives its preview and metadata, encodes the blobs
/// and stamps a fresh id and `added_at`. An unrecognisable media type or an
/// empty file is an error; preview problems degrade to an empty preview.
pub fn prepare(file: &FileHandle, folder: Option<FolderRef>, options: &PreviewOptions) -> Result<MediaRecord> {
    let Some(kind) = file.kind() else {
        exn::bail!(ErrorKind::UnsupportedMedia(file.name.clone()));
    };
    // A record without original bytes is corrupt and the store refuses it.
    if file.bytes.is_empty() {
        exn::bail!(ErrorKind::EmptyFile(file.name.clone()));
    }
    let derived = derive(file, kind, options);
    let preview = (!derived.preview.is_empty()).then_some(PreviewSource::Jpeg(derived.preview));
    let payload = encode(file, preview);
    Ok(MediaRecord {
        id: generate_id(),
        name: file.name.clone(),
        kind,
        mime_type: file.resolved_mime_type(),
        size_bytes: file.size(),
        last_modified: file.last_modified,
        original: payload.original,
        preview: payload.preview,
        metadata: derived.metadata,
        tags: Vec::new(),
        added_at: now_millis(),
        folder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use crate::preview::tests::png_bytes;

    #[test]
    fn test_prepare_image() {
        let file = FileHandle::new("holiday.png", png_bytes(40, 30), 1_650_000_000_000);
        let record = prepare(&file, Some(FolderRef::from_path("Trip")), &PreviewOptions::default()).unwrap();
        assert_eq!(record.kind, MediaKind::Image);
        assert_eq!(record.mime_type.as_deref(), Some("image/png"));
        assert_eq!(record.size_bytes, file.size());
        assert_eq!(record.last_modified, 1_650_000_000_000);
        assert!(!record.preview.is_empty());
        assert!(record.tags.is_empty());
        assert!(record.added_at >= record.last_modified);
        assert_eq!(record.folder_path(), Some("Trip"));
    }

    #[test]
    fn test_prepare_assigns_unique_ids() {
        let file = FileHandle::new("same.png", png_bytes(2, 2), 0);
        let a = prepare(&file, None, &PreviewOptions::default()).unwrap();
        let b = prepare(&file, None, &PreviewOptions::default()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_prepare_rejects_non_media() {
        let file = FileHandle::new("notes.txt", b"hello".to_vec(), 0);
        let err = prepare(&file, None, &PreviewOptions::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedMedia(name) if name == "notes.txt"));
    }

    #[test]
    fn test_prepare_rejects_empty_media() {
        let file = FileHandle::new("empty.jpg", Vec::new(), 0);
        let err = prepare(&file, None, &PreviewOptions::default()).unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyFile("empty.jpg".to_string()));
    }
}
