//! The persistent media store.
//!
//! One table, keyed by record id, with secondary indices on every field the
//! gallery filters or sorts by. All reads decode rows through
//! [`shoebox_media::codec::decode`] and silently drop corrupt records, so a
//! single bad row never takes the whole gallery down with it.

use crate::db::{DEFAULT_MAX_CONNECTIONS, Database};
use crate::error::{ErrorKind, Result};
use crate::folders::{FolderSummary, aggregate_folders};
use crate::models::MediaRow;
use crate::retry::{GaveUp, RetryPolicy, with_backoff};
use exn::{OptionExt, ResultExt};
use serde::Serialize;
use shoebox_media::{MediaItem, MediaKind, MediaRecord, codec};
use sqlx::SqlitePool;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::instrument;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    /// Throwaway database, gone when the store is closed.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub location: Location,
    pub max_connections: u32,
    /// Applied to batch writes only.
    pub retry: RetryPolicy,
}
impl StoreOptions {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            retry: RetryPolicy::default(),
        }
    }

    pub fn memory() -> Self {
        Self {
            location: Location::Memory,
            max_connections: 1,
            retry: RetryPolicy::default(),
        }
    }
}

/// Aggregate statistics over all readable records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub image_count: usize,
    pub video_count: usize,
}

/// Outcome of [`MediaStore::purge_corrupt`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub found: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Makes the next `n` batch-write attempts abort halfway through their
/// transaction.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
struct FaultInjector {
    remaining: std::sync::atomic::AtomicU32,
}
#[cfg(any(test, feature = "mock"))]
impl FaultInjector {
    fn trip(&self) -> bool {
        use std::sync::atomic::Ordering;
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Persistent, embedded store of [`MediaRecord`]s.
///
/// Must be [`init`](Self::init)ialised before use; every operation on an
/// uninitialised (or closed) store fails with [`ErrorKind::NotInitialized`].
#[derive(Debug)]
pub struct MediaStore {
    options: StoreOptions,
    db: RwLock<Option<Database>>,
    #[cfg(any(test, feature = "mock"))]
    faults: FaultInjector,
}

impl MediaStore {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            db: RwLock::new(None),
            #[cfg(any(test, feature = "mock"))]
            faults: FaultInjector::default(),
        }
    }

    /// Create and initialise a throwaway in-memory store.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::new(StoreOptions::memory());
        store.init().await?;
        Ok(store)
    }

    /// Make the next `n` batch-write attempts fail mid-transaction.
    #[cfg(any(test, feature = "mock"))]
    pub fn with_injected_failures(self, n: u32) -> Self {
        self.faults.remaining.store(n, std::sync::atomic::Ordering::SeqCst);
        self
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Open the database and bring its schema up to date. Idempotent.
    #[instrument(skip(self), fields(location = ?self.options.location))]
    pub async fn init(&self) -> Result<()> {
        let mut guard = self.db.write().await;
        if guard.is_some() {
            return Ok(());
        }
        let db = match &self.options.location {
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).or_raise(|| ErrorKind::StorageUnavailable)?;
                }
                Database::connect(path, self.options.max_connections).await?
            },
            Location::Memory => Database::connect_in_memory().await?,
        };
        tracing::debug!("Media store ready");
        *guard = Some(db);
        Ok(())
    }

    /// Close the database. The store can be initialised again afterwards.
    pub async fn close(&self) {
        if let Some(db) = self.db.write().await.take() {
            db.close().await;
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.db.read().await.is_some()
    }

    /// A handle to the open database. The lock is only held while cloning,
    /// never across a query.
    pub(crate) async fn database(&self) -> Result<Database> {
        self.db.read().await.clone().ok_or_raise(|| ErrorKind::NotInitialized)
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Insert or replace a single record.
    #[instrument(skip_all, fields(id = %record.id))]
    pub async fn put(&self, record: &MediaRecord) -> Result<()> {
        let db = self.database().await?;
        let row = Self::writable_row(record)?;
        upsert(&row)
            .execute(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        Ok(())
    }

    /// Insert or replace many records in a single transaction.
    ///
    /// Either every record is persisted or none is. A failed transaction is
    /// retried according to the store's [`RetryPolicy`]; once attempts run
    /// out the call fails with [`ErrorKind::BatchWriteFailed`]. An empty
    /// batch is a no-op.
    #[instrument(skip_all, fields(size = records.len()))]
    pub async fn put_batch(&self, records: &[MediaRecord]) -> Result<()> {
        let db = self.database().await?;
        if records.is_empty() {
            return Ok(());
        }
        // Convert everything up front so the transaction only does writes.
        let rows = records.iter().map(Self::writable_row).collect::<Result<Vec<_>>>()?;
        let size = rows.len();
        let pool = db.pool();
        let rows = rows.as_slice();
        let written = with_backoff(
            &self.options.retry,
            "put_batch",
            |e: &crate::error::Error| e.is_retryable(),
            move |attempt| self.write_rows(pool, rows, attempt),
        )
        .await;
        match written {
            Ok(()) => {
                tracing::debug!(size, "Batch written");
                Ok(())
            },
            Err(GaveUp { last_error, attempts }) if last_error.is_retryable() => {
                tracing::error!(size, attempts, error = ?last_error, "Batch write failed");
                Err(last_error.raise(ErrorKind::BatchWriteFailed { size, attempts }))
            },
            Err(GaveUp { last_error, .. }) => Err(last_error),
        }
    }

    async fn write_rows(&self, pool: &SqlitePool, rows: &[MediaRow], attempt: u32) -> Result<()> {
        tracing::trace!(attempt, "Writing batch");
        let mut tx = pool.begin().await.or_raise(|| ErrorKind::StorageUnavailable)?;
        #[cfg(any(test, feature = "mock"))]
        let abort_at = self.faults.trip().then_some(rows.len() / 2);
        for (_i, row) in rows.iter().enumerate() {
            #[cfg(any(test, feature = "mock"))]
            if abort_at == Some(_i) {
                // Dropping the transaction rolls back what was written so far.
                exn::bail!(ErrorKind::Transaction);
            }
            upsert(row).execute(&mut *tx).await.or_raise(|| ErrorKind::Transaction)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Transaction)?;
        Ok(())
    }

    fn writable_row(record: &MediaRecord) -> Result<MediaRow> {
        if record.is_corrupt() {
            exn::bail!(ErrorKind::CorruptRecord(record.id.clone()));
        }
        MediaRow::try_from(record)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Every readable record, newest first. Corrupt records are skipped.
    pub async fn get_all(&self) -> Result<Vec<MediaItem>> {
        let db = self.database().await?;
        let rows: Vec<MediaRow> = sqlx::query_as(include_str!("../queries/get_all.sql"))
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        Ok(decode_rows(rows))
    }

    /// Every readable record of one kind, newest first.
    pub async fn get_by_kind(&self, kind: MediaKind) -> Result<Vec<MediaItem>> {
        let db = self.database().await?;
        let rows: Vec<MediaRow> = sqlx::query_as(include_str!("../queries/get_by_kind.sql"))
            .bind(kind.as_str())
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        Ok(decode_rows(rows))
    }

    /// Every readable record imported from the folder at exactly `path`.
    pub async fn get_by_folder(&self, path: impl AsRef<str>) -> Result<Vec<MediaItem>> {
        let db = self.database().await?;
        let rows: Vec<MediaRow> = sqlx::query_as(include_str!("../queries/get_by_folder.sql"))
            .bind(path.as_ref())
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        Ok(decode_rows(rows))
    }

    /// The record with the given id. A corrupt record reads as absent.
    pub async fn get_by_id(&self, id: impl AsRef<str>) -> Result<Option<MediaItem>> {
        let db = self.database().await?;
        let row: Option<MediaRow> = sqlx::query_as(include_str!("../queries/get_by_id.sql"))
            .bind(id.as_ref())
            .fetch_optional(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        Ok(row.and_then(decode_row))
    }

    /// Number of stored rows, including corrupt ones.
    pub async fn count(&self) -> Result<u64> {
        let db = self.database().await?;
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count.sql"))
            .fetch_one(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }

    /// Totals over every readable record.
    pub async fn stats(&self) -> Result<MediaStats> {
        Ok(summarize(&self.get_all().await?))
    }

    /// Folders with at least one readable record, optionally restricted to
    /// one kind of media.
    pub async fn list_folders(&self, kind: Option<MediaKind>) -> Result<Vec<FolderSummary>> {
        let items = match kind {
            Some(kind) => self.get_by_kind(kind).await?,
            None => self.get_all().await?,
        };
        Ok(aggregate_folders(&items))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete one record. Deleting an unknown id is not an error; returns
    /// whether anything was removed.
    #[instrument(skip(self, id), fields(id = id.as_ref()))]
    pub async fn delete(&self, id: impl AsRef<str>) -> Result<bool> {
        let db = self.database().await?;
        let result = sqlx::query(include_str!("../queries/delete_by_id.sql"))
            .bind(id.as_ref())
            .execute(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete many records in one transaction: all of them or none.
    ///
    /// Unknown ids are skipped. Returns how many records were removed.
    #[instrument(skip_all, fields(size = ids.len()))]
    pub async fn delete_batch<S: AsRef<str>>(&self, ids: &[S]) -> Result<u64> {
        let db = self.database().await?;
        if ids.is_empty() {
            return Ok(0);
        }
        let size = ids.len();
        let mut tx = db.pool().begin().await.or_raise(|| ErrorKind::StorageUnavailable)?;
        let mut deleted = 0;
        for id in ids {
            let id = id.as_ref();
            let result = sqlx::query(include_str!("../queries/delete_by_id.sql"))
                .bind(id)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::BatchDeleteFailed { size, id: Some(id.to_string()) })?;
            deleted += result.rows_affected();
        }
        tx.commit().await.or_raise(|| ErrorKind::BatchDeleteFailed { size, id: None })?;
        tracing::debug!(deleted, "Batch deleted");
        Ok(deleted)
    }

    /// Remove every record. Returns how many were removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64> {
        let db = self.database().await?;
        let result = sqlx::query(include_str!("../queries/clear.sql"))
            .execute(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        tracing::info!(removed = result.rows_affected(), "Store cleared");
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Ids of records that have no original bytes.
    pub async fn find_corrupt(&self) -> Result<Vec<String>> {
        let db = self.database().await?;
        sqlx::query_scalar::<_, String>(include_str!("../queries/find_corrupt.sql"))
            .fetch_all(db.pool())
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)
    }

    /// Delete every corrupt record, one at a time. Individual failures are
    /// logged and counted rather than aborting the sweep.
    #[instrument(skip(self))]
    pub async fn purge_corrupt(&self) -> Result<PurgeReport> {
        let ids = self.find_corrupt().await?;
        let mut report = PurgeReport {
            found: ids.len(),
            ..Default::default()
        };
        for id in &ids {
            match self.delete(id).await {
                Ok(_) => report.deleted += 1,
                Err(e) => {
                    tracing::warn!(%id, error = ?e, "Could not delete corrupt record");
                    report.failed += 1;
                },
            }
        }
        if report.found > 0 {
            tracing::info!(found = report.found, deleted = report.deleted, failed = report.failed, "Purged corrupt records");
        }
        Ok(report)
    }
}

fn upsert(row: &MediaRow) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(include_str!("../queries/upsert_media.sql"))
        .bind(row.id.as_str())
        .bind(row.name.as_str())
        .bind(row.kind.as_str())
        .bind(row.mime_type.as_deref())
        .bind(row.size_bytes)
        .bind(row.last_modified)
        .bind(row.original.as_deref())
        .bind(row.preview.as_deref())
        .bind(row.metadata.as_str())
        .bind(row.tags.as_str())
        .bind(row.added_at)
        .bind(row.folder_path.as_deref())
        .bind(row.folder_name.as_deref())
}

fn decode_rows(rows: Vec<MediaRow>) -> Vec<MediaItem> {
    rows.into_iter().filter_map(decode_row).collect()
}

fn decode_row(row: MediaRow) -> Option<MediaItem> {
    let id = row.id.clone();
    let decoded = MediaRecord::try_from(row)
        .and_then(|record| codec::decode(record).or_raise(|| ErrorKind::CorruptRecord(id.clone())));
    match decoded {
        Ok(item) => Some(item),
        Err(e) => {
            tracing::debug!(%id, error = ?e, "Skipping unreadable record");
            None
        },
    }
}

fn summarize(items: &[MediaItem]) -> MediaStats {
    items.iter().fold(MediaStats::default(), |mut stats, item| {
        stats.total_files += 1;
        stats.total_size_bytes += item.size();
        match item.kind {
            MediaKind::Image => stats.image_count += 1,
            MediaKind::Video => stats.video_count += 1,
        }
        stats
    })
}
