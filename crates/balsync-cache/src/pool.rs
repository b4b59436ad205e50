//! SQLite pool for dataset storage
//!
//! Both file and in-memory databases enforce foreign keys and get the
//! schema applied before the pool is handed out. File databases use WAL
//! and a busy timeout so `balsync run` and one-off commands can share the
//! same file.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::CacheError;

/// Schema, applied idempotently on every open
const SCHEMA: &str = include_str!("migrations/20240101000000_initial.sql");

const FILE_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of SQLite connections to the dataset store
///
/// An in-memory database lives in a single connection; a second one
/// would open a different, empty database.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the database at `db_path`, creating the file and its parent
    /// directory when missing
    ///
    /// # Errors
    /// `ConnectionFailed` when the file cannot be created or opened,
    /// `MigrationFailed` when the schema cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(dir) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                CacheError::ConnectionFailed(format!("cannot create {}: {e}", dir.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = Self::open(options, FILE_CONNECTIONS, &db_path.display().to_string()).await?;

        info!(path = %db_path.display(), "Opened dataset store");
        Ok(pool)
    }

    /// Opens a private in-memory database, for tests
    pub async fn in_memory() -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;
        Self::open(options, 1, "memory").await
    }

    /// The underlying sqlx pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn open(
        options: SqliteConnectOptions,
        max_connections: u32,
        label: &str,
    ) -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options.foreign_keys(true))
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("{label}: {e}")))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| CacheError::MigrationFailed(format!("{label}: {e}")))?;
        debug!(database = label, "Schema applied");

        Ok(Self { pool })
    }
}
