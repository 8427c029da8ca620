//! Cache configuration

use std::time::Duration;

/// Configuration for expiry and background renewal behavior.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tempo_cache::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_auto_renew_interval(Duration::from_secs(60))
///     .with_auto_renew_window(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How often the background worker scans registered keys for entries due
    /// for renewal. `Duration::ZERO` disables background renewal.
    ///
    /// Default: disabled
    pub auto_renew_interval: Duration,

    /// How far before expiry an entry counts as due for renewal. Applies to
    /// both renew-on-read and the background scan.
    ///
    /// Default: 2 minutes
    pub auto_renew_window: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            auto_renew_interval: Duration::ZERO,
            auto_renew_window: Duration::from_secs(120),
        }
    }
}

impl CacheConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the background renewal scan interval.
    pub fn with_auto_renew_interval(mut self, interval: Duration) -> Self {
        self.auto_renew_interval = interval;
        self
    }

    /// Sets the renewal window.
    pub fn with_auto_renew_window(mut self, window: Duration) -> Self {
        self.auto_renew_window = window;
        self
    }
}
