//! Pluggable storage backends
//!
//! The cache is built over a minimal key-value contract: get/set/remove
//! opaque string values by string key. Backends know nothing about expiry —
//! that metadata lives inside the serialized entries and is interpreted by
//! the cache itself.

mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use async_trait::async_trait;

use crate::error::StorageError;

/// Trait for storage backends.
///
/// Implementations store and retrieve opaque string values by string keys.
/// Failures propagate to the caller of the cache operation that triggered
/// them; the cache never masks a broken backend.
///
/// # Example
///
/// ```
/// use tempo_cache::storage::InMemoryStorage;
///
/// let storage = InMemoryStorage::new();
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Retrieves the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, overwriting any existing value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the value stored under `key`. Removing an absent key is a
    /// no-op.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
