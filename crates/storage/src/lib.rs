//! Flat file storage.
//!
//! The media store itself lives in SQLite; this crate covers the two places
//! the gallery still deals in plain files: folders being imported, and the
//! small key-value side store holding user preferences.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
