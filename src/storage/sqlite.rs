//! SQLite-backed persistent storage backend

use std::path::Path;

use async_sqlite::Client;
use async_sqlite::ClientBuilder;
use async_sqlite::JournalMode;
use async_sqlite::rusqlite;
use async_sqlite::rusqlite::OptionalExtension;
use async_trait::async_trait;

use super::StorageBackend;
use crate::error::StorageError;

/// A persistent storage backend backed by SQLite.
///
/// Values are stored in a single key-value table and persist across process
/// restarts. Uses WAL journal mode for better concurrent read performance.
///
/// # Example
///
/// ```ignore
/// use tempo_cache::storage::SqliteStorage;
///
/// // File-based storage
/// let storage = SqliteStorage::open("cache.db").await?;
///
/// // In-memory storage (for testing)
/// let storage = SqliteStorage::open_in_memory().await?;
/// ```
pub struct SqliteStorage {
    client: Client,
}

impl SqliteStorage {
    /// Opens a SQLite backend at the specified path.
    ///
    /// Creates the database file and table if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let client = ClientBuilder::new()
            .path(path)
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    /// Opens an in-memory SQLite backend.
    ///
    /// Useful for testing. Data is lost when the backend is dropped.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let client = ClientBuilder::new().path(":memory:").open().await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    /// Initializes the key-value table schema.
    async fn init_schema(client: &Client) -> Result<(), StorageError> {
        client
            .conn(|conn| {
                conn.execute(
                    "CREATE TABLE IF NOT EXISTS cache (
                        key TEXT PRIMARY KEY,
                        value TEXT NOT NULL
                    )",
                    [],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let key = key.to_string();

        let value = self
            .client
            .conn(move |conn| {
                conn.query_row("SELECT value FROM cache WHERE key = ?", [key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()
            })
            .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        let value = value.to_string();

        self.client
            .conn(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO cache (key, value) VALUES (?, ?)",
                    rusqlite::params![key, value],
                )
            })
            .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let key = key.to_string();

        self.client
            .conn(move |conn| conn.execute("DELETE FROM cache WHERE key = ?", [key]))
            .await?;

        Ok(())
    }
}
