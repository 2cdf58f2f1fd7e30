//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! process start
//!     → Storage::open (single SQLite pool)
//!     → schema.rs (create tables, migrate legacy columns)
//!     → shared by ConfigStore and AuditLog
//!
//! process shutdown
//!     → Storage::close
//! ```
//!
//! # Design Decisions
//! - One handle per process, cloned by reference into the stores
//! - SQLite serializes writers; no application-level locking
//! - In-memory databases are pinned to a single connection

pub mod schema;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database URL could not be parsed.
    #[error("invalid database url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    /// Any query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Process-wide handle to the bridge database.
#[derive(Clone, Debug)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (creating if needed) the database at `url` and bring the schema up to date.
    pub async fn open(url: &str) -> StorageResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|source| StorageError::InvalidUrl {
                url: url.to_string(),
                source,
            })?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every pooled connection to `:memory:` would see its own empty database.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options.connect_with(options).await?;
        schema::initialize(&pool).await?;

        tracing::info!(url = %url, in_memory, "Storage opened");
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> StorageResult<Self> {
        Self::open("sqlite::memory:").await
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections. Further queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Storage closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let storage = Storage::open_in_memory().await.unwrap();
        assert!(!storage.is_closed());

        storage.close().await;
        assert!(storage.is_closed());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let err = Storage::open("sqlite::memory:?bogus=1").await.unwrap_err();
        assert!(err.to_string().contains("invalid database url"));
    }
}
