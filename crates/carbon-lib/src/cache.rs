//! Expiring key/value store for provider responses
//!
//! Entries are checked for expiry when read; nothing is evicted in the
//! background.

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Cache of provider results keyed by (provider, region)
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Build the cache key for a provider/region pair
    pub fn key(provider: &str, region_code: &str) -> String {
        format!("{}:{}", provider, region_code)
    }

    /// Get a live entry, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        None
    }

    /// Store a value for `ttl`
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Number of stored entries, including ones not yet found to be expired
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = CacheStore::new();
        let key = CacheStore::<f64>::key("global", "eu-west-1");
        cache.insert(key.clone(), 42.0, Duration::from_secs(60));

        assert_eq!(cache.get(&key), Some(42.0));
        assert_eq!(cache.get("global:us-east-1"), None);
    }

    #[test]
    fn test_expired_entry_removed_on_read() {
        let cache = CacheStore::new();
        cache.insert("grid:eu-west-2", 1.0, Duration::from_secs(60));
        assert_eq!(cache.len(), 1);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(cache.get_at("grid:eu-west-2", later), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expiry_is_lazy() {
        let cache = CacheStore::new();
        cache.insert("a", 1u32, Duration::ZERO);
        // still stored until someone reads it
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_keys_scoped_by_provider_and_region() {
        assert_eq!(CacheStore::<u8>::key("global", "eu-west-1"), "global:eu-west-1");
        assert_ne!(
            CacheStore::<u8>::key("global", "eu-west-1"),
            CacheStore::<u8>::key("grid", "eu-west-1")
        );
    }
}
