//! Expiry-aware key-value caching for web API client SDKs
//!
//! Wraps stored values with expiry metadata over a pluggable storage
//! backend. Entries can expire at an absolute time, be consumed by a single
//! read, or be renewed — on read or by a background worker — via registered
//! per-key update functions. Built to back OAuth token handling and API
//! response caching in an async client SDK.

pub mod storage;

mod cache;
mod config;
mod entry;
mod error;
mod token;

pub use cache::ExpiringCache;
pub use cache::UpdateFunction;
pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use entry::Cacheable;
pub use entry::EXPIRED;
pub use error::CacheError;
pub use error::StorageError;
pub use token::AccessToken;
