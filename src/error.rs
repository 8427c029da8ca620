//! Error types

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend failed to read or write.
    #[error("Storage backend error: {message}")]
    Backend { message: String },
}

impl StorageError {
    /// Creates a backend error with the given message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl From<async_sqlite::Error> for StorageError {
    fn from(err: async_sqlite::Error) -> Self {
        Self::backend(err.to_string())
    }
}

/// Errors from cache operations.
///
/// Renewal failures are not represented here: a failed renewal attempt is
/// logged and swallowed, and the caller is served the existing entry instead.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The create function passed to `get_or_create` produced no value.
    #[error("Create function produced no value for key `{key}`")]
    Creation { key: String },

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A cache entry could not be serialized or deserialized.
    #[error("Cache entry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
