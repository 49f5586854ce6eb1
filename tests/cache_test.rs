//! Tests for [`ResultCache`] — per-session result storage with expiry.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;

use huginn::cache::spawn_sweeper;
use huginn::{CacheKey, CacheLookup, ResultCache};

fn key(command: &str) -> CacheKey {
    CacheKey::new("s1", command)
}

#[test]
fn cache_miss_on_empty() {
    let cache = ResultCache::default();
    assert_eq!(cache.lookup(&key("build A")), CacheLookup::Miss);
}

#[test]
fn store_then_lookup() {
    let cache = ResultCache::default();
    cache.store(key("build A"), json!({"ok": true}));

    assert_eq!(
        cache.lookup(&key("build A")),
        CacheLookup::Hit(json!({"ok": true}))
    );
}

#[test]
fn overwrite_replaces_entry() {
    let cache = ResultCache::default();
    cache.store(key("build A"), json!(1));
    cache.store(key("build A"), json!(2));

    assert_eq!(cache.lookup(&key("build A")), CacheLookup::Hit(json!(2)));
    assert_eq!(cache.len(), 1);
}

#[test]
fn key_is_session_scoped() {
    let cache = ResultCache::default();
    cache.store(CacheKey::new("s1", "build A"), json!("one"));

    assert!(cache.lookup(&CacheKey::new("s1", "build A")).is_hit());
    assert!(!cache.lookup(&CacheKey::new("s2", "build A")).is_hit());
    // Field boundaries are part of the key.
    cache.store(CacheKey::new("a:b", "c"), json!("x"));
    assert!(!cache.lookup(&CacheKey::new("a", "b:c")).is_hit());
}

#[test]
fn remove_and_clear() {
    let cache = ResultCache::default();
    cache.store(key("a"), json!(1));
    cache.store(key("b"), json!(2));

    cache.remove(&key("a"));
    assert!(!cache.lookup(&key("a")).is_hit());
    assert!(cache.lookup(&key("b")).is_hit());

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn concurrent_same_key_stores_keep_one_value() {
    const WRITERS: i64 = 16;
    let cache = Arc::new(ResultCache::default());

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..100 {
                    cache.store(key("build A"), json!({ "writer": i, "payload": "x".repeat(64) }));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let CacheLookup::Hit(value) = cache.lookup(&key("build A")) else {
        panic!("expected a cached value");
    };
    let writer = value["writer"].as_i64().unwrap();
    assert!((0..WRITERS).contains(&writer));
    assert_eq!(value["payload"], json!("x".repeat(64)));
    assert_eq!(cache.len(), 1);
}

#[test]
fn concurrent_distinct_keys_do_not_interfere() {
    let cache = Arc::new(ResultCache::default());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..50 {
                    let k = CacheKey::new(format!("s{t}"), format!("build {i}"));
                    cache.store(k.clone(), json!(i));
                    assert_eq!(cache.lookup(&k), CacheLookup::Hit(json!(i)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 400);
}

#[test]
fn capacity_is_bounded() {
    let cache = ResultCache::new(Duration::from_secs(60), 10);
    for i in 0..100 {
        cache.store(key(&format!("build {i}")), json!(i));
    }
    assert!(cache.len() <= 10);
}

#[tokio::test(start_paused = true)]
async fn lookup_after_ttl_reports_expired() {
    let cache = ResultCache::new(Duration::from_secs(60), 100);
    cache.store(key("build A"), json!(1));

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(cache.lookup(&key("build A")).is_hit());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.lookup(&key("build A")), CacheLookup::Expired);
}

#[tokio::test(start_paused = true)]
async fn sweeper_removes_only_expired_entries() {
    let cache = Arc::new(ResultCache::new(Duration::from_secs(15 * 60), 100));
    let sweeper = spawn_sweeper(Arc::clone(&cache), Duration::from_secs(5 * 60));

    cache.store(key("old"), json!(1));
    tokio::time::sleep(Duration::from_secs(12 * 60)).await;
    cache.store(key("fresh"), json!(2));

    // Sweeps at 15m (old is exactly 15m: kept) and 20m (old removed).
    tokio::time::sleep(Duration::from_secs(9 * 60)).await;
    assert_eq!(cache.lookup(&key("old")), CacheLookup::Miss);
    assert!(cache.lookup(&key("fresh")).is_hit());

    sweeper.abort();
}
