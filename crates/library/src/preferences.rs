//! User preferences, persisted as one JSON document.
//!
//! Preferences are kept apart from the media database, in a flat storage
//! backend under a single key, and overwritten wholesale on every save.
//! Nothing here is critical: every failure is logged and swallowed, so a
//! broken preferences file can never stop the gallery from working.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shoebox_storage::BackendHandle;
use shoebox_storage::error::ErrorKind as StorageErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_KEY: &str = "preferences.json";

pub struct PreferenceStore {
    backend: BackendHandle,
    key: PathBuf,
}

impl PreferenceStore {
    pub fn new(backend: BackendHandle, key: impl Into<PathBuf>) -> Self {
        Self { backend, key: key.into() }
    }

    pub fn key(&self) -> &Path {
        &self.key
    }

    /// Serialize and overwrite the stored preferences.
    ///
    /// Returns whether they were persisted.
    pub async fn save<T: Serialize + ?Sized>(&self, preferences: &T) -> bool {
        match self.try_save(preferences).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %self.key.display(), error = ?e, "Could not save preferences");
                false
            },
        }
    }

    /// Load the stored preferences, or `None` if there are none or they
    /// cannot be read.
    pub async fn load<T: DeserializeOwned>(&self) -> Option<T> {
        match self.try_load().await {
            Ok(preferences) => preferences,
            Err(e) => {
                tracing::warn!(key = %self.key.display(), error = ?e, "Could not load preferences");
                None
            },
        }
    }

    /// Forget the stored preferences. Returns whether nothing is left behind.
    pub async fn clear(&self) -> bool {
        match self.backend.delete(&self.key).await {
            Ok(()) => true,
            Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => true,
            Err(e) => {
                tracing::warn!(key = %self.key.display(), error = ?e, "Could not clear preferences");
                false
            },
        }
    }

    async fn try_save<T: Serialize + ?Sized>(&self, preferences: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(preferences).or_raise(|| ErrorKind::Preferences)?;
        self.backend.write(&self.key, &bytes).await.or_raise(|| ErrorKind::Preferences)?;
        tracing::debug!(key = %self.key.display(), bytes = bytes.len(), "Saved preferences");
        Ok(())
    }

    async fn try_load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let bytes = match self.backend.read(&self.key).await {
            Ok(bytes) => bytes,
            Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.raise(ErrorKind::Preferences)),
        };
        let preferences = serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Preferences)?;
        Ok(Some(preferences))
    }
}
