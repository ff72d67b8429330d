//! Local filesystem storage backend.
//!
//! Used both to walk folders being imported and to hold the preference side
//! store. Listings skip hidden entries (`.DS_Store`, `.thumbnails/`) and
//! come back in name order: a directory's files, then its subdirectories.
//! Writes go through a temporary file so a crash never leaves half a
//! preferences document behind.

use crate::backend::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::path::{is_hidden, validate as validate_path};
use crate::{FileInfo, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::ffi::OsString;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Suffix of the sibling file a write lands in before being renamed over
/// its destination.
const PARTIAL_SUFFIX: &str = ".partial";

/// Local filesystem storage backend rooted at an absolute directory.
///
/// ```no_run
/// use shoebox_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let photos = LocalBackend::new("photos", "/home/me/Pictures/Trip")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}

impl LocalBackend {
    /// Open (creating if missing) the directory at `root`.
    ///
    /// # Errors
    ///
    /// [`InvalidPath`](ErrorKind::InvalidPath) when `root` is relative or is
    /// not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        // Once per backend; not worth an async constructor.
        std::fs::create_dir_all(&root).map_err(|e| io_error(e, &root))?;
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path)?))
    }

    fn relative_path(&self, absolute: &Path) -> Result<PathBuf> {
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("{} is outside {}", absolute.display(), self.root.display()))
        })?;
        validate_path(relative)
    }

    /// Read one directory, returning its visible entries sorted by name.
    async fn read_dir_sorted(&self, dir: &Path) -> Result<Vec<(OsString, PathBuf, Metadata)>> {
        let mut reader = fs::read_dir(dir).await.map_err(|e| io_error(e, dir))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| io_error(e, dir))? {
            let name = entry.file_name();
            if name.as_encoded_bytes().first() == Some(&b'.') {
                continue;
            }
            let path = entry.path();
            // Follows symlinks; a broken one fails here and is dropped.
            match fs::metadata(&path).await {
                Ok(metadata) => entries.push((name, path, metadata)),
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable entry"),
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let prefix = match prefix.map(validate_path).transpose() {
            Ok(prefix) => prefix,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        if prefix.as_deref().is_some_and(is_hidden) {
            return Box::pin(futures::stream::empty());
        }
        // Start at the prefix itself: `Trip/day2` matches `Trip/day2/a.jpg`
        // but never `Trip/day20/a.jpg`. A prefix naming a file lists that
        // file alone.
        let start = prefix.as_ref().map_or_else(|| self.root.clone(), |p| self.root.join(p));

        Box::pin(stream! {
            match fs::metadata(&start).await {
                Ok(metadata) if metadata.is_file() => {
                    yield self.relative_path(&start).map(|relative| FileInfo::from_metadata(relative, &metadata));
                    return;
                },
                Ok(_) => {},
                // Listing somewhere that does not exist is empty, not an error.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
                Err(e) => {
                    yield Err(exn::Exn::from(io_error(e, &start)));
                    return;
                },
            }

            let mut pending = vec![start];
            while let Some(dir) = pending.pop() {
                let entries = match self.read_dir_sorted(&dir).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        yield Err(e);
                        continue;
                    },
                };
                let mut subdirs = Vec::new();
                for (_name, path, metadata) in entries {
                    if metadata.is_dir() {
                        subdirs.push(path);
                    } else if metadata.is_file() {
                        yield self.relative_path(&path).map(|relative| FileInfo::from_metadata(relative, &metadata));
                    }
                }
                // Popped in reverse, so subdirectories are walked in name order.
                pending.extend(subdirs.into_iter().rev());
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let absolute = self.absolute_path(path)?;
        Ok(fs::try_exists(&absolute).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let absolute = self.absolute_path(path)?;
        Ok(fs::read(&absolute).await.map_err(|e| io_error(e, path))?)
    }

    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>> {
        let absolute = self.absolute_path(path)?;
        let file = fs::File::open(&absolute).await.map_err(|e| io_error(e, path))?;
        let mut head = Vec::with_capacity(bytes);
        file.take(bytes as u64).read_to_end(&mut head).await.map_err(ErrorKind::Io)?;
        Ok(head)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let absolute = self.absolute_path(path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await.map_err(|e| io_error(e, path))?;
        }
        let mut partial = absolute.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        fs::write(&partial, data).await.map_err(|e| io_error(e, path))?;
        if let Err(e) = fs::rename(&partial, &absolute).await {
            let _ = fs::remove_file(&partial).await;
            exn::bail!(io_error(e, path));
        }
        tracing::trace!(backend = %self.name, path = %path.display(), bytes = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let absolute = self.absolute_path(path)?;
        Ok(fs::remove_file(&absolute).await.map_err(|e| io_error(e, path))?)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let absolute = self.absolute_path(path)?;
        let metadata = fs::metadata(&absolute).await.map_err(|e| io_error(e, path))?;
        Ok(FileInfo::from_metadata(validate_path(path)?, &metadata))
    }
}

fn io_error(e: std::io::Error, path: &Path) -> ErrorKind {
    match e.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
        _ => ErrorKind::Io(e),
    }
}
