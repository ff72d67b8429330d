//! Embedded object store for gallery media.
//!
//! Records produced by `shoebox-media` are kept in a single SQLite table with
//! indices on kind, name, modification time, size and folder. The database
//! is the source of truth for everything the gallery shows: there is no
//! filesystem mirror to rebuild it from.
//!
//! - [`MediaStore`]: lifecycle, CRUD, batch writes with retry, maintenance.
//! - [`aggregate_folders`]: the folder view derived from stored items.

mod db;
pub mod error;
mod folders;
mod models;
mod retry;
mod store;

pub use crate::db::Database;
pub use crate::folders::{FolderSummary, aggregate_folders};
pub use crate::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
pub use crate::store::{Location, MediaStats, MediaStore, PurgeReport, StoreOptions};
