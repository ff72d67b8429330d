//! Storage backend trait and implementations.
//!
//! The `StorageBackend` trait gives import sources and the preference side
//! store one interface, whether the bytes live on disk or (in tests) in
//! memory.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// A flat namespace of files addressed by relative path.
///
/// Every path passes through [`validate_path`](crate::validate_path) before
/// an implementation touches it, so nothing can reach outside the root.
/// Hidden entries (any segment starting with `.`) are never listed.
///
/// ```
/// use std::path::Path;
/// use shoebox_storage::{backend::StorageBackend, error::Result};
///
/// async fn saved_preferences(backend: &dyn StorageBackend) -> Result<Option<Vec<u8>>> {
///     let key = Path::new("preferences.json");
///     match backend.exists(key).await? {
///         true => backend.read(key).await.map(Some),
///         false => Ok(None),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Label for log events.
    fn name(&self) -> &str;

    /// Everything [`list_stream`](Self::list_stream) yields, collected.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Files under `prefix` (whole path segments, so `Trip` does not match
    /// `Trips/`), or every file without one. A prefix naming nothing gives
    /// an empty stream; ordering is up to the backend.
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use shoebox_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut files = backend.list_stream(Some(Path::new("Trip")));
    /// let mut total = 0;
    /// while let Some(file) = files.try_next().await? {
    ///     total += file.size;
    /// }
    /// println!("Trip holds {total} bytes");
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Whole contents. [`NotFound`](crate::error::ErrorKind::NotFound) when
    /// absent.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// At most `bytes` leading bytes, enough to sniff a media type.
    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>>;

    /// Create or replace, making parent directories on the way.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// [`NotFound`](crate::error::ErrorKind::NotFound) when absent.
    async fn delete(&self, path: &Path) -> Result<()>;

    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
