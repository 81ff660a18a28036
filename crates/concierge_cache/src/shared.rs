//! Thread-safe cache handle used by the dispatcher.

use crate::{CacheConfig, CacheKey, ResponseCache};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::time::Duration;

/// Result of a [`SharedResponseCache::get_or_fetch`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Served from the cache
    Hit(JsonValue),
    /// Fetched and stored
    Fetched(JsonValue),
}

impl Lookup {
    /// Whether the value came from the cache.
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    /// Unwrap the value.
    pub fn into_value(self) -> JsonValue {
        match self {
            Lookup::Hit(value) | Lookup::Fetched(value) => value,
        }
    }
}

/// [`ResponseCache`] behind a mutex.
///
/// The lock is only held for map operations, never across the fetch, so two
/// concurrent misses for the same key both reach the network. The second
/// store simply replaces the first.
#[derive(Debug, Default)]
pub struct SharedResponseCache {
    inner: Mutex<ResponseCache>,
}

impl SharedResponseCache {
    /// Create a new shared cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(ResponseCache::new(config)),
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its success.
    ///
    /// Failed fetches are returned unchanged and nothing is stored.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<Lookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<JsonValue, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Lookup::Hit(value));
        }

        let value = fetch().await?;
        self.insert(key.clone(), value.clone(), ttl);
        Ok(Lookup::Fetched(value))
    }

    /// Cloned value for `key`, if live.
    pub fn get(&self, key: &CacheKey) -> Option<JsonValue> {
        self.inner.lock().get(key).map(|entry| entry.value().clone())
    }

    /// Store a value.
    pub fn insert(&self, key: CacheKey, value: JsonValue, ttl: Duration) {
        self.inner.lock().insert(key, value, ttl);
    }

    /// Remove one entry.
    pub fn evict(&self, key: &CacheKey) -> bool {
        self.inner.lock().evict(key)
    }

    /// Remove every entry whose key matches `predicate`.
    pub fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: FnMut(&CacheKey) -> bool,
    {
        self.inner.lock().invalidate(predicate)
    }

    /// Remove expired entries.
    pub fn cleanup_expired(&self) -> usize {
        self.inner.lock().cleanup_expired()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
