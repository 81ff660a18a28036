//! Tests for response caching.

use concierge_cache::{CacheConfig, CacheKey, Lookup, ResponseCache, SharedResponseCache};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn key(endpoint: &str, params: &[(&str, &str)]) -> CacheKey {
    CacheKey::new("GET", endpoint, params)
}

#[test]
fn test_cache_insert_and_get() {
    let mut cache = ResponseCache::new(CacheConfig::default());
    let key = key("/book_services/1", &[("staff_id", "9")]);
    let value = json!([{"id": 1, "title": "Haircut"}]);

    cache.insert(key.clone(), value.clone(), Duration::from_secs(60));

    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.value(), &value);
}

#[test]
fn test_cache_miss() {
    let mut cache = ResponseCache::new(CacheConfig::default());
    assert!(cache.get(&key("/company/1", &[])).is_none());
}

#[test]
fn test_param_order_does_not_matter() {
    let mut cache = ResponseCache::new(CacheConfig::default());
    let stored = key("/book_dates/1", &[("staff_id", "4"), ("service_ids", "7")]);
    let lookup = key("/book_dates/1", &[("service_ids", "7"), ("staff_id", "4")]);

    cache.insert(stored, json!(["2024-05-01"]), Duration::from_secs(600));
    assert!(cache.get(&lookup).is_some());
}

#[test]
fn test_different_params_are_different_entries() {
    let mut cache = ResponseCache::new(CacheConfig::default());
    let a = key("/book_times/1/4/2024-05-01", &[("service_ids", "7")]);
    let b = key("/book_times/1/4/2024-05-01", &[("service_ids", "8")]);

    cache.insert(a.clone(), json!(["10:00"]), Duration::from_secs(300));
    cache.insert(b.clone(), json!(["11:00"]), Duration::from_secs(300));

    assert_eq!(cache.get(&a).unwrap().value(), &json!(["10:00"]));
    assert_eq!(cache.get(&b).unwrap().value(), &json!(["11:00"]));
}

#[test]
fn test_separator_inside_value_does_not_collide() {
    let embedded = key("/clients/42", &[("fullname", "X&phone=123")]);
    let split = key("/clients/42", &[("fullname", "X"), ("phone", "123")]);

    assert_ne!(embedded, split);

    let mut cache = ResponseCache::new(CacheConfig::default());
    cache.insert(split, json!([{"id": 1}]), Duration::from_secs(60));
    assert!(cache.get(&embedded).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let mut cache = ResponseCache::new(CacheConfig::default());
    let key = key("/book_times/1/4/2024-05-01", &[]);
    cache.insert(key.clone(), json!(["10:00"]), Duration::from_secs(300));

    tokio::time::advance(Duration::from_secs(200)).await;
    assert!(cache.get(&key).is_some());

    tokio::time::advance(Duration::from_secs(101)).await;
    assert!(cache.get(&key).is_none());
    assert!(!cache.contains(&key));
}

#[test]
fn test_capacity_overflow_evicts_first_inserted() {
    let config = CacheConfig::default().with_max_size(3);
    let mut cache = ResponseCache::new(config);
    let keys: Vec<_> = (0..4)
        .map(|i| key("/records/1", &[("page", i.to_string().as_str())]))
        .collect();

    for (i, key) in keys.iter().enumerate() {
        // Reading the first key does not protect it: eviction follows insertion order
        cache.get(&keys[0]);
        cache.insert(key.clone(), json!(i), Duration::from_secs(60));
    }

    assert_eq!(cache.len(), 3);
    assert!(!cache.contains(&keys[0]));
    for key in &keys[1..] {
        assert!(cache.contains(key));
    }
}

#[test]
fn test_reinsert_moves_key_to_back() {
    let config = CacheConfig::default().with_max_size(2);
    let mut cache = ResponseCache::new(config);
    let a = key("/company/1", &[]);
    let b = key("/company/2", &[]);
    let c = key("/company/3", &[]);

    cache.insert(a.clone(), json!(1), Duration::from_secs(60));
    cache.insert(b.clone(), json!(2), Duration::from_secs(60));
    cache.insert(a.clone(), json!(10), Duration::from_secs(60));
    cache.insert(c.clone(), json!(3), Duration::from_secs(60));

    assert!(cache.contains(&a));
    assert!(!cache.contains(&b));
    assert_eq!(cache.get(&a).unwrap().value(), &json!(10));
}

#[test]
fn test_invalidate_by_endpoint_prefix() {
    let mut cache = ResponseCache::new(CacheConfig::default());
    cache.insert(key("/book_times/1/4/2024-05-01", &[]), json!([]), Duration::from_secs(300));
    cache.insert(key("/book_dates/1", &[]), json!([]), Duration::from_secs(600));
    cache.insert(key("/company/1", &[]), json!({}), Duration::from_secs(3600));

    let removed = cache.invalidate(|key| key.endpoint().starts_with("/book_"));
    assert_eq!(removed, 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_expired() {
    let mut cache = ResponseCache::new(CacheConfig::default());
    cache.insert(key("/records/1", &[]), json!([]), Duration::from_secs(60));
    cache.insert(key("/company/1", &[]), json!({}), Duration::from_secs(3600));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(cache.cleanup_expired(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_disabled_cache_stores_nothing() {
    let config = CacheConfig::default().with_enabled(false);
    let mut cache = ResponseCache::new(config);
    let key = key("/company/1", &[]);

    cache.insert(key.clone(), json!({}), Duration::from_secs(60));
    assert!(cache.is_empty());
    assert!(cache.get(&key).is_none());
}

#[tokio::test]
async fn test_get_or_fetch_hits_after_first_fetch() {
    let cache = SharedResponseCache::new(CacheConfig::default());
    let key = key("/book_staff/1", &[]);
    let fetches = AtomicUsize::new(0);

    for expected_hit in [false, true, true] {
        let lookup = cache
            .get_or_fetch(&key, Duration::from_secs(1800), || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!([{"id": 4}]))
            })
            .await
            .unwrap();
        assert_eq!(lookup.is_hit(), expected_hit);
        assert_eq!(lookup.into_value(), json!([{"id": 4}]));
    }

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_or_fetch_does_not_cache_errors() {
    let cache = SharedResponseCache::new(CacheConfig::default());
    let key = key("/book_staff/1", &[]);

    let failed = cache
        .get_or_fetch(&key, Duration::from_secs(60), || async { Err::<serde_json::Value, _>("boom") })
        .await;
    assert_eq!(failed, Err("boom"));
    assert!(cache.is_empty());

    let lookup = cache
        .get_or_fetch(&key, Duration::from_secs(60), || async { Ok::<_, &str>(json!(1)) })
        .await
        .unwrap();
    assert_eq!(lookup, Lookup::Fetched(json!(1)));
}
