//! balsync Cache - Dataset persistence
//!
//! SQLite-based storage for:
//! - Datasets (Bases Adresses Locales) and their embedded sync record
//! - Voies, numeros and toponymes, with soft-delete timestamps
//!
//! Sync record writes are conditional: `update_sync` and `set_sync_paused`
//! only apply while the stored status still matches the guard the caller
//! read, and report whether a row changed.
//!
//! - [`DatabasePool`] - SQLite pool, schema applied on open
//! - [`SqliteAddressRepository`] - `IAddressRepository` over that pool
//! - [`CacheError`] - Pool and schema failures
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use balsync_cache::{DatabasePool, SqliteAddressRepository};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/balsync/balsync.db")).await?;
//! let repo = SqliteAddressRepository::new(pool.pool().clone());
//! // Use repo as IAddressRepository...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteAddressRepository;

/// Failures opening or migrating the database
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The database file could not be opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A statement was rejected
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The schema could not be applied
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be turned back into a domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
