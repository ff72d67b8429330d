//! Import sources are opened through [`ReadOnlyBackend`], so importing a
//! folder never changes what is on disk.

use crate::backend::FileInfoStream;
use crate::error::Result;
use crate::models::FileInfo;
use crate::{BackendHandle, StorageBackend};
use async_trait::async_trait;
use std::path::Path;

/// A view of another backend that can look but not touch.
///
/// Listing and reading go straight to the wrapped backend. Writes and deletes
/// report success and leave the source alone; each is logged so a stray
/// mutation of an import source shows up in the logs.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    source: BackendHandle,
}

impl ReadOnlyBackend {
    pub fn new(source: BackendHandle) -> Self {
        Self { source }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.source.name()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        self.source.list_stream(prefix)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.source.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.source.read(path).await
    }

    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>> {
        self.source.read_head(path, bytes).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(source = self.name(), path = %path.display(), bytes = data.len(), "Import source is read-only; write ignored");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(source = self.name(), path = %path.display(), "Import source is read-only; delete ignored");
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.source.stat(path).await
    }
}
