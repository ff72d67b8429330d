//! In-memory backend for tests.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::{is_hidden, validate as validate_path};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MockFile {
    modified: UtcDateTime,
    data: Vec<u8>,
}

/// In-memory storage backend.
///
/// Listing follows [`LocalBackend`](super::LocalBackend) where it matters to
/// callers: hidden paths are left out and prefixes match whole segments.
/// Files come back in plain path order. Reads of paths marked with
/// [`failing_reads`](Self::failing_reads) fail with a backend error, to
/// exercise per-file error handling.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    files: RwLock<BTreeMap<PathBuf, MockFile>>,
    failing: BTreeSet<PathBuf>,
}

impl MockBackend {
    /// Seed with files stamped with the current time.
    ///
    /// # Panics
    ///
    /// When a path is invalid. Broken test setup should never pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let now = UtcDateTime::now();
        Self::with_timestamped_files(files.into_iter().map(|(path, data)| (path, now, data)))
    }

    /// Seed with files, each with its own modification time.
    ///
    /// # Panics
    ///
    /// When a path is invalid.
    pub fn with_timestamped_files(
        files: impl IntoIterator<Item = (impl Into<PathBuf>, UtcDateTime, impl Into<Vec<u8>>)>,
    ) -> Self {
        let files = files
            .into_iter()
            .map(|(path, modified, data)| {
                let path = path.into();
                match validate_path(&path) {
                    Ok(valid) => (valid, MockFile { modified, data: data.into() }),
                    Err(_) => panic!("MockBackend: invalid path {}", path.display()),
                }
            })
            .collect();
        Self {
            name: "mock".to_string(),
            files: RwLock::new(files),
            failing: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make full reads of these paths fail. Heads can still be read, the
    /// way a file can be sniffed and then vanish or turn unreadable.
    pub fn failing_reads(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.failing.extend(paths.into_iter().map(Into::into));
        self
    }

    async fn get(&self, path: &Path) -> Result<(PathBuf, MockFile)> {
        let path = validate_path(path)?;
        match self.files.read().await.get(&path) {
            Some(file) => Ok((path, file.clone())),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            files: RwLock::default(),
            failing: BTreeSet::new(),
        }
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let prefix = match prefix.map(validate_path).transpose() {
            Ok(prefix) => prefix,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        Box::pin(async_stream::stream! {
            // Copy out under the lock; nothing is held across a yield.
            let matching: Vec<FileInfo> = self
                .files
                .read()
                .await
                .iter()
                .filter(|(path, _)| !is_hidden(path))
                .filter(|(path, _)| prefix.as_ref().is_none_or(|p| path.starts_with(p)))
                .map(|(path, file)| FileInfo::new(path.clone(), file.data.len() as u64, file.modified))
                .collect();
            for info in matching {
                yield Ok(info);
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let (path, file) = self.get(path).await?;
        if self.failing.contains(&path) {
            exn::bail!(ErrorKind::BackendError(format!("simulated read failure for {}", path.display())));
        }
        Ok(file.data)
    }

    async fn read_head(&self, path: &Path, bytes: usize) -> Result<Vec<u8>> {
        let (_, mut file) = self.get(path).await?;
        file.data.truncate(bytes);
        Ok(file.data)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        let file = MockFile {
            modified: UtcDateTime::now(),
            data: data.to_vec(),
        };
        self.files.write().await.insert(path, file);
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        match self.files.write().await.remove(&path) {
            Some(_) => Ok(()),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let (path, file) = self.get(path).await?;
        Ok(FileInfo::new(path, file.data.len() as u64, file.modified))
    }
}
