//! Response cache implementation.

use crate::CacheKey;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// Cache entry with value and expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: JsonValue,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.inserted_at.elapsed())
    }
}

/// Configuration for the response cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct CacheConfig {
    /// Maximum cache size (number of entries)
    #[serde(default = "default_max_size")]
    max_size: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_max_size() -> usize {
    500
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            enabled: default_enabled(),
        }
    }
}

/// Cache for read responses from the booking service.
///
/// Stores JSON values with TTL-based expiration. When full, the entry that
/// was inserted first is evicted, regardless of how often it was read.
/// Reads are short-lived and heavily repeated, so insertion order is a close
/// enough stand-in for recency.
///
/// # Example
///
/// ```
/// use concierge_cache::{CacheConfig, CacheKey, ResponseCache};
/// use serde_json::json;
/// use std::time::Duration;
///
/// let mut cache = ResponseCache::new(CacheConfig::default());
/// let key = CacheKey::new("GET", "/company/42", &[] as &[(&str, &str)]);
///
/// cache.insert(key.clone(), json!({"title": "Salon"}), Duration::from_secs(3600));
///
/// if let Some(entry) = cache.get(&key) {
///     println!("Cached: {:?}", entry.value());
/// }
/// ```
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: HashMap<CacheKey, CacheEntry>,
    insertion_order: VecDeque<CacheKey>,
}

impl ResponseCache {
    /// Create a new response cache with configuration.
    pub fn new(config: CacheConfig) -> Self {
        tracing::debug!(
            max_size = config.max_size,
            enabled = config.enabled,
            "Creating new ResponseCache"
        );
        Self {
            config,
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    /// Insert a response into the cache.
    ///
    /// Re-inserting an existing key replaces its value and moves it to the
    /// back of the eviction queue.
    #[tracing::instrument(
        skip(self, key, value),
        fields(key = %key, cache_size = self.entries.len())
    )]
    pub fn insert(&mut self, key: CacheKey, value: JsonValue, ttl: Duration) {
        if !self.config.enabled || self.config.max_size == 0 {
            tracing::debug!("Cache disabled, skipping insert");
            return;
        }

        if self.entries.contains_key(&key) {
            self.remove_from_order(&key);
        } else if self.entries.len() >= self.config.max_size {
            self.evict_oldest();
        }

        self.insertion_order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );

        tracing::debug!(ttl = ?ttl, "Inserted entry into cache");
    }

    /// Get a cached response.
    ///
    /// Returns None if:
    /// - Entry doesn't exist
    /// - Entry is expired (and removes it)
    /// - Cache is disabled
    #[tracing::instrument(skip(self, key), fields(key = %key, cache_size = self.entries.len()))]
    pub fn get(&mut self, key: &CacheKey) -> Option<&CacheEntry> {
        if !self.config.enabled {
            return None;
        }

        if self.entries.get(key)?.is_expired() {
            tracing::debug!("Cache entry expired, removing");
            self.evict(key);
            return None;
        }

        let entry = self.entries.get(key)?;
        tracing::debug!(time_remaining = ?entry.time_remaining(), "Cache hit");
        Some(entry)
    }

    /// Remove one entry. Returns true if it was present.
    pub fn evict(&mut self, key: &CacheKey) -> bool {
        if self.entries.remove(key).is_some() {
            self.remove_from_order(key);
            true
        } else {
            false
        }
    }

    /// Remove every entry whose key matches `predicate`.
    pub fn invalidate<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&CacheKey) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        let entries = &self.entries;
        self.insertion_order.retain(|key| entries.contains_key(key));

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "Invalidated cache entries");
        }
        removed
    }

    /// Remove expired entries from cache.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let entries = &self.entries;
        self.insertion_order.retain(|key| entries.contains_key(key));

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!(removed, remaining = self.entries.len(), "Cleaned up expired cache entries");
        }
        removed
    }

    /// Clear all cache entries.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.insertion_order.clear();
        tracing::info!(cleared = count, "Cleared cache");
    }

    /// Check whether a live or expired entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn remove_from_order(&mut self, key: &CacheKey) {
        if let Some(pos) = self.insertion_order.iter().position(|k| k == key) {
            self.insertion_order.remove(pos);
        }
    }

    /// Evict the earliest-inserted entry.
    fn evict_oldest(&mut self) {
        if let Some(key) = self.insertion_order.pop_front() {
            tracing::debug!(key = %key, "Evicting oldest entry");
            self.entries.remove(&key);
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
