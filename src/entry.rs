//! Cache entries and expiry metadata

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Sentinel `expires` value marking an entry as already expired.
///
/// Some callers (e.g. an auth flow invalidating a credential) want to keep an
/// entry in storage but have the next read evict it; writing this sentinel as
/// the expiry does exactly that.
pub const EXPIRED: i64 = -1;

/// Trait for values that can be stored in the cache.
///
/// Besides the serde bounds, implementors may override [`is_placeholder`] to
/// mark "empty" values — e.g. a blank credential — that
/// [`get_or_create`](crate::ExpiringCache::get_or_create) should hand back to
/// the caller without persisting.
///
/// [`is_placeholder`]: Cacheable::is_placeholder
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync {
    /// Returns `true` if this value is an empty placeholder that must not be
    /// written to storage.
    fn is_placeholder(&self) -> bool {
        false
    }
}

/// A cached value together with its expiry metadata.
///
/// Serializes as a shallow merge: the value's own fields sit at the top level
/// of the JSON object, next to `expires` (absolute epoch milliseconds,
/// omitted when the entry never expires) and `expiresOnAccess` (omitted when
/// false).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The cached value.
    #[serde(flatten)]
    pub value: T,
    /// Absolute expiry in epoch milliseconds.
    ///
    /// `None` means the entry never expires. [`EXPIRED`] marks an entry that
    /// is already invalid regardless of the current time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    /// One-shot flag: the entry is valid for exactly one successful read,
    /// after which it is removed from storage.
    #[serde(default, skip_serializing_if = "is_false")]
    pub expires_on_access: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl<T> CacheEntry<T> {
    /// Creates an entry that never expires.
    pub fn new(value: T) -> Self {
        Self {
            value,
            expires: None,
            expires_on_access: false,
        }
    }

    /// Creates an entry that expires `ttl` from now.
    pub fn with_ttl(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires: Some(now_ms() + ttl.as_millis() as i64),
            expires_on_access: false,
        }
    }

    /// Creates an entry with an absolute expiry in epoch milliseconds.
    pub fn expiring_at(value: T, expires: i64) -> Self {
        Self {
            value,
            expires: Some(expires),
            expires_on_access: false,
        }
    }

    /// Marks this entry as one-shot: valid for exactly one read.
    pub fn one_shot(mut self) -> Self {
        self.expires_on_access = true;
        self
    }

    /// Returns `true` if this entry is invalid at `now` (epoch milliseconds).
    ///
    /// Entries without an expiry never expire. The [`EXPIRED`] sentinel is
    /// invalid at any time.
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires {
            Some(EXPIRED) => true,
            Some(expires) => expires <= now,
            None => false,
        }
    }

    /// Returns `true` if this entry's remaining time-to-live at `now` is
    /// shorter than `window`.
    ///
    /// Entries without an expiry are never due. An already-expired entry is
    /// due — renewal is how an expired-but-refreshable credential comes back.
    pub fn is_due_for_renewal(&self, now: i64, window: Duration) -> bool {
        due_for_renewal(self.expires, now, window)
    }
}

/// Shared due-for-renewal predicate, also used by the background scan where
/// only the expiry metadata is deserialized.
pub(crate) fn due_for_renewal(expires: Option<i64>, now: i64, window: Duration) -> bool {
    match expires {
        Some(expires) => expires - now < window.as_millis() as i64,
        None => false,
    }
}

/// Current time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
    }

    impl Cacheable for Payload {}

    fn payload() -> Payload {
        Payload {
            name: "value".into(),
        }
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let entry = CacheEntry::new(payload());
        assert!(!entry.is_expired(i64::MAX));
        assert!(!entry.is_due_for_renewal(i64::MAX, Duration::from_secs(120)));
    }

    #[test]
    fn test_sentinel_is_always_expired() {
        let entry = CacheEntry::expiring_at(payload(), EXPIRED);
        assert!(entry.is_expired(0));
        assert!(entry.is_expired(now_ms()));
    }

    #[test]
    fn test_expiry_boundary() {
        let entry = CacheEntry::expiring_at(payload(), 1_000);
        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1_000));
        assert!(entry.is_expired(1_001));
    }

    #[test]
    fn test_due_for_renewal_window() {
        let window = Duration::from_millis(120_000);
        // Expires 60s from "now": inside the window.
        let entry = CacheEntry::expiring_at(payload(), 60_000);
        assert!(entry.is_due_for_renewal(0, window));
        // Expires 600s from "now": outside the window.
        let entry = CacheEntry::expiring_at(payload(), 600_000);
        assert!(!entry.is_due_for_renewal(0, window));
    }

    #[test]
    fn test_serializes_as_shallow_merge() {
        let entry = CacheEntry::expiring_at(payload(), 42);
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["name"], "value");
        assert_eq!(json["expires"], 42);
        // Omitted when false.
        assert!(json.get("expiresOnAccess").is_none());

        let json = serde_json::to_value(CacheEntry::new(payload()).one_shot()).unwrap();
        assert_eq!(json["expiresOnAccess"], true);
        assert!(json.get("expires").is_none());
    }

    #[test]
    fn test_deserializes_without_metadata() {
        let entry: CacheEntry<Payload> = serde_json::from_str(r#"{"name":"value"}"#).unwrap();
        assert_eq!(entry.value, payload());
        assert_eq!(entry.expires, None);
        assert!(!entry.expires_on_access);
    }
}
