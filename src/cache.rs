//! The expiring cache and its background renewal worker

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::entry::Cacheable;
use crate::entry::due_for_renewal;
use crate::entry::now_ms;
use crate::error::CacheError;
use crate::storage::StorageBackend;

type ErasedUpdateFn =
    dyn Fn(String) -> BoxFuture<'static, Result<Option<String>, CacheError>> + Send + Sync;

/// A per-key renewal callback.
///
/// Constructed from a strongly-typed async closure over the entry's value
/// type; erased internally so a single registry can hold callbacks for
/// heterogeneous value types. Returning `Ok(None)` (or an error) marks the
/// renewal attempt as failed, which keeps the existing entry in place.
#[derive(Clone)]
pub struct UpdateFunction {
    inner: Arc<ErasedUpdateFn>,
}

impl UpdateFunction {
    /// Wraps a typed renewal callback.
    ///
    /// The callback receives the current entry and produces the replacement
    /// entry, which is persisted under the same key.
    pub fn new<T, F, Fut>(update: F) -> Self
    where
        T: Cacheable + 'static,
        F: Fn(CacheEntry<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<CacheEntry<T>>, CacheError>> + Send + 'static,
    {
        Self {
            inner: Arc::new(
                move |raw: String| -> BoxFuture<'static, Result<Option<String>, CacheError>> {
                    let entry = match serde_json::from_str::<CacheEntry<T>>(&raw) {
                        Ok(entry) => entry,
                        Err(err) => return Box::pin(std::future::ready(Err(err.into()))),
                    };
                    let renewed = update(entry);
                    Box::pin(async move {
                        match renewed.await? {
                            Some(entry) => Ok(Some(serde_json::to_string(&entry)?)),
                            None => Ok(None),
                        }
                    })
                },
            ),
        }
    }

    async fn call(&self, raw: String) -> Result<Option<String>, CacheError> {
        (self.inner)(raw).await
    }
}

/// Expiry metadata alone, for the background scan: registered keys may hold
/// values of any type, so only the shared fields are deserialized there.
#[derive(Deserialize)]
struct EntryMetadata {
    #[serde(default)]
    expires: Option<i64>,
}

struct RenewalWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// A typed, expiry-aware cache over a pluggable storage backend.
///
/// Entries carry their expiry metadata inside the serialized value (see
/// [`CacheEntry`]). Reads evict expired entries, consume one-shot entries,
/// and — when a renewal callback is registered for the key — refresh entries
/// nearing expiry before returning them. An optional background worker scans
/// all registered keys on an interval and renews due entries proactively.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use tempo_cache::CacheEntry;
/// use tempo_cache::ExpiringCache;
/// use tempo_cache::storage::InMemoryStorage;
///
/// # use tempo_cache::AccessToken;
/// # async fn example() -> Result<(), tempo_cache::CacheError> {
/// let cache = ExpiringCache::new(Arc::new(InMemoryStorage::new()));
///
/// let entry = cache
///     .get_or_create(
///         "access-token",
///         || async {
///             let token = AccessToken::new("token", "Bearer", 3600);
///             Ok(Some(CacheEntry::with_ttl(token, Duration::from_secs(3600))))
///         },
///         None,
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Concurrency
///
/// Operations on the same key are not mutually exclusive: two racing
/// `get_or_create` calls can both observe a miss and both create, with the
/// last write winning. Callers that need at-most-once creation must serialize
/// externally.
pub struct ExpiringCache {
    storage: Arc<dyn StorageBackend>,
    update_functions: Arc<RwLock<HashMap<String, UpdateFunction>>>,
    config: CacheConfig,
    renewal_worker: Mutex<Option<RenewalWorker>>,
}

impl ExpiringCache {
    /// Creates a cache over `storage` with the default configuration
    /// (background renewal disabled, 2 minute renewal window).
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self::with_config(storage, CacheConfig::default())
    }

    /// Creates a cache over `storage` with the given configuration.
    pub fn with_config(storage: Arc<dyn StorageBackend>, config: CacheConfig) -> Self {
        Self {
            storage,
            update_functions: Arc::new(RwLock::new(HashMap::new())),
            config,
            renewal_worker: Mutex::new(None),
        }
    }

    /// Registers a renewal callback for `key`, overwriting any prior
    /// registration.
    ///
    /// The callback is consulted by [`get`](Self::get) when the entry is due
    /// for renewal, and by the background worker when one is running.
    pub async fn register_update_function(&self, key: impl Into<String>, update: UpdateFunction) {
        self.update_functions.write().await.insert(key.into(), update);
    }

    /// Returns the cached entry for `key`, creating it on a miss.
    ///
    /// If `update` is supplied it is registered for `key` first. On a miss
    /// (or an expired entry), `create` is awaited; `Ok(None)` fails with
    /// [`CacheError::Creation`]. A created value whose
    /// [`is_placeholder`](Cacheable::is_placeholder) is true is returned to
    /// the caller but not persisted; any other created entry is persisted
    /// before being returned.
    pub async fn get_or_create<T, F, Fut>(
        &self,
        key: &str,
        create: F,
        update: Option<UpdateFunction>,
    ) -> Result<CacheEntry<T>, CacheError>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<CacheEntry<T>>, CacheError>>,
    {
        if let Some(update) = update {
            self.register_update_function(key, update).await;
        }

        if let Some(entry) = self.get(key).await? {
            return Ok(entry);
        }

        let created = create().await?.ok_or_else(|| CacheError::Creation {
            key: key.to_string(),
        })?;

        if !created.value.is_placeholder() {
            self.set_cache_item(key, &created).await?;
        }

        Ok(created)
    }

    /// Returns the entry stored under `key`, or `None` if absent or expired.
    ///
    /// If the entry is due for renewal and a renewal callback is registered
    /// for `key`, the renewal is attempted (and awaited) first and the entry
    /// re-read, so the caller sees the refreshed value. Renewal failures are
    /// logged and swallowed; the existing entry is served instead. Expired
    /// entries are removed from storage. One-shot entries are removed from
    /// storage but still returned — a true one-shot read.
    pub async fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        let Some(raw) = self.storage.get(key).await? else {
            return Ok(None);
        };
        let entry: CacheEntry<T> = serde_json::from_str(&raw)?;

        if entry.is_due_for_renewal(now_ms(), self.config.auto_renew_window) {
            let update = self.update_functions.read().await.get(key).cloned();
            if let Some(update) = update {
                Self::attempt_renewal(self.storage.as_ref(), key, raw, &update).await;

                // The attempt may have replaced the entry under this key.
                let Some(raw) = self.storage.get(key).await? else {
                    return Ok(None);
                };
                let entry = serde_json::from_str(&raw)?;
                return self.finish_read(key, entry).await;
            }
        }

        self.finish_read(key, entry).await
    }

    /// Expiry eviction and one-shot consumption, after any renewal.
    async fn finish_read<T: Cacheable>(
        &self,
        key: &str,
        entry: CacheEntry<T>,
    ) -> Result<Option<CacheEntry<T>>, CacheError> {
        if entry.is_expired(now_ms()) {
            self.storage.remove(key).await?;
            return Ok(None);
        }

        if entry.expires_on_access {
            self.storage.remove(key).await?;
        }

        Ok(Some(entry))
    }

    /// Stores `value` under `key` with an expiry of `ttl` from now.
    pub async fn set<T: Cacheable>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.set_cache_item(key, &CacheEntry::with_ttl(value, ttl)).await
    }

    /// Serializes `entry` and writes it to storage, overwriting any existing
    /// entry for `key`.
    pub async fn set_cache_item<T: Cacheable>(
        &self,
        key: &str,
        entry: &CacheEntry<T>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(entry)?;
        self.storage.set(key, &raw).await?;
        Ok(())
    }

    /// Removes the entry for `key`. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(key).await?;
        Ok(())
    }

    /// Starts the background renewal worker.
    ///
    /// No-op when `auto_renew_interval` is zero or a worker is already
    /// running. The worker scans every registered key each interval and
    /// renews entries inside the renewal window; call
    /// [`shutdown`](Self::shutdown) to stop it deterministically.
    pub async fn start_auto_renewal(&self) {
        let interval = self.config.auto_renew_interval;
        if interval.is_zero() {
            return;
        }

        let mut worker = self.renewal_worker.lock().await;
        if worker.is_some() {
            return;
        }

        let storage = Arc::clone(&self.storage);
        let update_functions = Arc::clone(&self.update_functions);
        let window = self.config.auto_renew_window;
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; skip it so the
            // first scan happens one full interval after startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        Self::renew_due_entries(storage.as_ref(), &update_functions, window).await;
                    }
                }
            }
        });

        *worker = Some(RenewalWorker { cancel, handle });
    }

    /// Stops the background renewal worker and waits for it to finish.
    ///
    /// No-op if no worker is running.
    pub async fn shutdown(&self) {
        let worker = self.renewal_worker.lock().await.take();
        if let Some(worker) = worker {
            worker.cancel.cancel();
            let _ = worker.handle.await;
        }
    }

    /// One background scan: renew every registered entry that is present in
    /// storage and due. Renewals are awaited one key at a time, and one key's
    /// failure never prevents the rest of the scan.
    async fn renew_due_entries(
        storage: &dyn StorageBackend,
        update_functions: &RwLock<HashMap<String, UpdateFunction>>,
        window: Duration,
    ) {
        let registered: Vec<(String, UpdateFunction)> = update_functions
            .read()
            .await
            .iter()
            .map(|(key, update)| (key.clone(), update.clone()))
            .collect();

        for (key, update) in registered {
            let raw = match storage.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Skipping unreadable cache entry in renewal scan");
                    continue;
                }
            };

            let metadata: EntryMetadata = match serde_json::from_str(&raw) {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Skipping malformed cache entry in renewal scan");
                    continue;
                }
            };

            if due_for_renewal(metadata.expires, now_ms(), window) {
                Self::attempt_renewal(storage, &key, raw, &update).await;
            }
        }
    }

    /// One best-effort renewal attempt, shared by the on-read path and the
    /// background scan. Any failure — including the storage write — is logged
    /// and swallowed: a stale-but-present entry beats surfacing a transient
    /// refresh error.
    async fn attempt_renewal(
        storage: &dyn StorageBackend,
        key: &str,
        raw: String,
        update: &UpdateFunction,
    ) {
        match update.call(raw).await {
            Ok(Some(renewed)) => {
                if let Err(err) = storage.set(key, &renewed).await {
                    tracing::warn!(key = %key, error = %err, "Failed to persist renewed cache entry");
                } else {
                    tracing::debug!(key = %key, "Renewed cache entry");
                }
            }
            Ok(None) => {
                tracing::warn!(key = %key, "Update function produced no value, keeping existing entry");
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Cache entry renewal failed, keeping existing entry");
            }
        }
    }
}

impl Drop for ExpiringCache {
    fn drop(&mut self) {
        // Signal the worker without awaiting it, so dropping the cache never
        // leaks the renewal task.
        if let Ok(mut worker) = self.renewal_worker.try_lock() {
            if let Some(worker) = worker.take() {
                worker.cancel.cancel();
            }
        }
    }
}
