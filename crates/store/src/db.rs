//! Database connection and pool management.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::sqlite::{
    SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// Schema migrations, embedded at compile time and applied on every connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
/// Batch imports hold the single WAL writer for a while; readers listing the
/// gallery wait this long rather than fail.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Database connection pool for the media store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max.max(1))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::StorageUnavailable)?;
        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    /// Open the database file at `path`, creating and migrating it as
    /// needed.
    pub async fn connect(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let options = Self::connect_options().filename(path.as_ref()).create_if_missing(true);
        Self::new(options, max_connections).await
    }

    /// Connect to an in-memory database.
    ///
    /// Not `#[cfg(test)]` so other crates can use it in their tests, and so
    /// the CLI can run against a throwaway store.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::connect_options().filename(":memory:");
        // Every pooled connection to ":memory:" would see its own database,
        // so keep it to one.
        Self::new(options, 1).await
    }

    /// Options shared by every connection in the pool. Blobs make rows
    /// large, hence the bigger page cache.
    fn connect_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .auto_vacuum(SqliteAutoVacuum::None)
            .pragma("wal_autocheckpoint", "800")
            .pragma("cache_size", "-16384")
            .pragma("temp_store", "MEMORY")
    }

    #[instrument("migrating media database", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool once checked-out connections come back.
    pub async fn close(&self) {
        // Refresh planner statistics on the way out; failure is harmless.
        if let Err(e) = sqlx::query("PRAGMA optimize").execute(&self.pool).await {
            tracing::debug!(error = %e, "PRAGMA optimize failed");
        }
        self.pool.close().await;
    }
}
