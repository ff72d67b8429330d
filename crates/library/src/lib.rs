//! Everything the gallery does on top of the store.
//!
//! - [`query`]: pure filter/sort functions over a snapshot of items.
//! - [`selection`]: which items the user has selected.
//! - [`preferences`]: best-effort JSON side store for UI preferences.
//! - [`import`]: folder import, streaming progress as it goes.
//! - [`remote`]: payloads of the upload/listing HTTP API.

pub mod error;
pub mod import;
pub mod preferences;
pub mod query;
pub mod remote;
pub mod selection;

pub use crate::import::{ImportEvent, ImportOptions, ImportSummary, import};
pub use crate::preferences::PreferenceStore;
pub use crate::query::{Bounds, FilterOptions, SortBy, SortOptions, SortOrder, current_folder_files, filter, sort};
pub use crate::selection::Selection;
