use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::storage::{Storage, StorageError};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Malformed cache entry {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("TTL of {0} minutes is out of range")]
    InvalidTtl(i64),
}

/// Longest TTL accepted in either direction (about a thousand years), which
/// keeps `expiredAt` a four-digit-year RFC 3339 timestamp.
pub const MAX_TTL_MINUTES: i64 = 1000 * 366 * 24 * 60;

/// Stored shape of a cache slot: `{"value":...,"expiredAt":"<RFC 3339>"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringEntry<V> {
    pub value: V,
    #[serde(rename = "expiredAt")]
    pub expired_at: DateTime<Utc>,
}

impl<V> ExpiringEntry<V> {
    pub fn new(value: V, ttl_minutes: i64, now: DateTime<Utc>) -> Result<Self, CacheError> {
        let expired_at = Some(ttl_minutes)
            .filter(|m| (-MAX_TTL_MINUTES..=MAX_TTL_MINUTES).contains(m))
            .and_then(Duration::try_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(CacheError::InvalidTtl(ttl_minutes))?;
        Ok(Self { value, expired_at })
    }

    /// Valid strictly before `expired_at`; the boundary instant is expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expired_at
    }
}

pub struct ExpiringCache {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    // Serializes read-compare-evict against writes to the same cache
    guard: Mutex<()>,
}

impl ExpiringCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            guard: Mutex::new(()),
        }
    }

    /// Store `value` under `key` for `ttl_minutes`, replacing any prior entry.
    pub fn set<V: Serialize>(&self, key: &str, value: &V, ttl_minutes: i64) -> Result<(), CacheError> {
        let entry = ExpiringEntry::new(value, ttl_minutes, self.clock.now())?;
        let contents = serde_json::to_string(&entry).map_err(StorageError::from)?;

        let _held = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        self.storage.write(key, &contents)?;
        debug!(key = key, expired_at = %entry.expired_at, "Cached entry");
        Ok(())
    }

    /// Return the live value under `key`. An expired entry is removed
    /// from storage and reported as a miss.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, CacheError> {
        let _held = self.guard.lock().unwrap_or_else(|e| e.into_inner());

        let Some(raw) = self.storage.read(key)? else {
            return Ok(None);
        };

        let entry: ExpiringEntry<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|source| CacheError::Malformed {
                key: key.to_string(),
                source,
            })?;

        if !entry.is_valid_at(self.clock.now()) {
            self.storage.remove(key)?;
            debug!(key = key, expired_at = %entry.expired_at, "Evicted expired entry");
            return Ok(None);
        }

        serde_json::from_value(entry.value)
            .map(Some)
            .map_err(|source| CacheError::Malformed {
                key: key.to_string(),
                source,
            })
    }

    /// Same contract as [`ExpiringCache::get`].
    pub fn validate<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, CacheError> {
        self.get(key)
    }

    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        let _held = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        self.storage.remove(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use chrono::Datelike;
    use crate::storage::MemoryStorage;

    fn cache_with_clock() -> (ExpiringCache, MemoryStorage, Arc<ManualClock>) {
        let storage = MemoryStorage::new();
        let clock = Arc::new(ManualClock::default());
        let cache = ExpiringCache::with_clock(Arc::new(storage.clone()), clock.clone());
        (cache, storage, clock)
    }

    #[test]
    fn test_set_then_get_immediately() {
        let (cache, _, _) = cache_with_clock();
        cache.set("nav", &vec![1, 2, 3], 1).unwrap();
        assert_eq!(cache.get::<Vec<i32>>("nav").unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_expired_entry_is_purged() {
        let (cache, storage, clock) = cache_with_clock();
        cache.set("nav", &vec![1, 2, 3], 1).unwrap();

        clock.advance(Duration::seconds(61));

        assert_eq!(cache.get::<Vec<i32>>("nav").unwrap(), None);
        assert!(!storage.contains("nav"));
        assert_eq!(cache.get::<Vec<i32>>("nav").unwrap(), None);
    }

    #[test]
    fn test_boundary_instant_is_expired() {
        let (cache, storage, clock) = cache_with_clock();
        cache.set("nav", &"menu", 1).unwrap();

        clock.advance(Duration::seconds(59));
        assert_eq!(cache.get::<String>("nav").unwrap().as_deref(), Some("menu"));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get::<String>("nav").unwrap(), None);
        assert!(!storage.contains("nav"));
    }

    #[test]
    fn test_read_does_not_extend_expiry() {
        let (cache, _, clock) = cache_with_clock();
        cache.set("nav", &1u8, 2).unwrap();

        clock.advance(Duration::seconds(90));
        assert_eq!(cache.get::<u8>("nav").unwrap(), Some(1));

        clock.advance(Duration::seconds(31));
        assert_eq!(cache.get::<u8>("nav").unwrap(), None);
    }

    #[test]
    fn test_get_missing_key_has_no_side_effects() {
        let (cache, storage, _) = cache_with_clock();
        assert_eq!(cache.get::<u8>("never-written").unwrap(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let (cache, _, clock) = cache_with_clock();
        cache.set("nav", &vec![1], 1).unwrap();
        clock.advance(Duration::seconds(50));
        cache.set("nav", &vec![2], 1).unwrap();
        clock.advance(Duration::seconds(50));
        assert_eq!(cache.get::<Vec<i32>>("nav").unwrap(), Some(vec![2]));
    }

    #[test]
    fn test_validate_matches_get() {
        let (cache, storage, clock) = cache_with_clock();
        cache.set("nav", &"x", 1).unwrap();
        assert_eq!(cache.validate::<String>("nav").unwrap().as_deref(), Some("x"));

        clock.advance(Duration::minutes(1));
        assert_eq!(cache.validate::<String>("nav").unwrap(), None);
        assert!(!storage.contains("nav"));
    }

    #[test]
    fn test_malformed_entry_is_an_error() {
        let (cache, storage, _) = cache_with_clock();
        storage.write("nav", "{not json").unwrap();
        assert!(matches!(
            cache.get::<Vec<i32>>("nav"),
            Err(CacheError::Malformed { ref key, .. }) if key == "nav"
        ));

        storage.write("nav", r#"{"value":"abc","expiredAt":"2999-01-01T00:00:00Z"}"#).unwrap();
        assert!(matches!(cache.get::<Vec<i32>>("nav"), Err(CacheError::Malformed { .. })));
    }

    #[test]
    fn test_expiry_uses_stored_entry_timestamp() {
        let (cache, storage, _) = cache_with_clock();
        storage
            .write("old", r#"{"value":[1],"expiredAt":"2000-01-01T00:00:00.000Z"}"#)
            .unwrap();
        storage
            .write("new", r#"{"value":[2],"expiredAt":"2999-01-01T00:00:00.000Z"}"#)
            .unwrap();

        assert_eq!(cache.get::<Vec<i32>>("old").unwrap(), None);
        assert_eq!(cache.get::<Vec<i32>>("new").unwrap(), Some(vec![2]));
    }

    #[test]
    fn test_entry_format() {
        let (cache, storage, clock) = cache_with_clock();
        clock.set("2024-03-01T10:00:00Z".parse().unwrap());
        cache.set("nav", &vec![1, 2, 3], 5).unwrap();

        let raw = storage.read("nav").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["value"], serde_json::json!([1, 2, 3]));
        assert_eq!(value["expiredAt"], "2024-03-01T10:05:00Z");
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        let (cache, storage, clock) = cache_with_clock();
        clock.set("2024-03-01T10:00:00Z".parse().unwrap());

        for ttl in [1_000_000_000_000, i64::MAX, i64::MIN, MAX_TTL_MINUTES + 1] {
            assert!(matches!(
                cache.set("nav", &vec![1], ttl),
                Err(CacheError::InvalidTtl(m)) if m == ttl
            ));
        }
        assert!(storage.is_empty());

        cache.set("nav", &vec![1], MAX_TTL_MINUTES).unwrap();
        let raw = storage.read("nav").unwrap().unwrap();
        let entry: ExpiringEntry<Vec<i32>> = serde_json::from_str(&raw).unwrap();
        assert!(entry.expired_at.year() < 10_000);
        assert_eq!(cache.get::<Vec<i32>>("nav").unwrap(), Some(vec![1]));
    }

    #[test]
    fn test_negative_ttl_is_already_expired() {
        let (cache, storage, _) = cache_with_clock();
        cache.set("nav", &vec![1], -5).unwrap();
        assert_eq!(cache.get::<Vec<i32>>("nav").unwrap(), None);
        assert!(!storage.contains("nav"));
    }
}
