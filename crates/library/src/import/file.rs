use super::ImportOptions;
use super::error::{ErrorKind, Result};
use exn::ResultExt;
use shoebox_media::error::ErrorKind as MediaErrorKind;
use shoebox_media::{FileHandle, FolderRef, MediaKind, MediaRecord, prepare, probe};
use shoebox_storage::{BackendHandle, FileInfo};
use std::path::{Path, PathBuf};

pub(super) enum Prepared {
    Record(Box<MediaRecord>),
    Skipped(PathBuf),
}

/// Work out which folder a file belongs to.
///
/// `root` is the name the import was filed under; the file's parent
/// directories (relative to the import root) are appended to it. Without a
/// root the file is loose, wherever it sits.
///
/// ```
/// use shoebox_library::import::folder_for;
/// use std::path::Path;
///
/// let folder = folder_for(Some("Trip"), Path::new("day2/dive.mov")).unwrap();
/// assert_eq!(folder.path, "Trip/day2");
/// assert_eq!(folder.name, "day2");
/// assert!(folder_for(None, Path::new("day2/dive.mov")).is_none());
/// ```
pub fn folder_for(root: Option<&str>, path: &Path) -> Option<FolderRef> {
    let mut segments: Vec<String> = root?.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect();
    if let Some(parent) = path.parent() {
        segments.extend(parent.iter().map(|s| s.to_string_lossy().into_owned()));
    }
    (!segments.is_empty()).then(|| FolderRef::from_path(segments.join("/")))
}

/// Read one source file and turn it into a record.
///
/// The extension is checked first and magic bytes second, so only the head
/// of a non-media file is ever read.
pub(super) async fn prepare_file(backend: &BackendHandle, info: FileInfo, options: &ImportOptions) -> Result<Prepared> {
    let head = backend.read_head(&info.path, probe::SNIFF_LEN).await.or_raise(|| ErrorKind::Storage)?;
    let sniffed = probe::sniff_mime(&head);
    if MediaKind::from_path(&info.path).is_none() && sniffed.is_none() {
        tracing::trace!(path = %info.path.display(), "Not a media file");
        return Ok(Prepared::Skipped(info.path));
    }

    let bytes = backend.read(&info.path).await.or_raise(|| ErrorKind::Storage)?;
    let mut file = FileHandle::new(info.file_name(), bytes, info.modified_millis());
    if let Some(mime) = sniffed {
        file = file.with_mime_type(mime);
    }
    let relative = options.prefix.as_deref().and_then(|p| info.path.strip_prefix(p).ok()).unwrap_or(&info.path);
    let folder = folder_for(options.folder.as_deref(), relative);
    let preview = options.preview;

    let prepared = tokio::task::spawn_blocking(move || prepare(&file, folder, &preview))
        .await
        .or_raise(|| ErrorKind::Prepare)?;
    match prepared {
        Ok(record) => {
            tracing::debug!(path = %info.path.display(), id = %record.id, kind = %record.kind, "Prepared record");
            Ok(Prepared::Record(Box::new(record)))
        },
        Err(e) if matches!(&*e, MediaErrorKind::UnsupportedMedia(_)) => Ok(Prepared::Skipped(info.path)),
        Err(e) => Err(e.raise(ErrorKind::Prepare)),
    }
}
