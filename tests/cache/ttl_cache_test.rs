//! Integration tests for cache expiry and size bounds.

use schema_intel::cache::{CacheKey, MetadataCache};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// TTL
// ============================================================================

#[test]
fn test_entry_visible_before_ttl_and_gone_after() {
    let cache = MetadataCache::new();
    let ttl = Duration::from_millis(300);
    cache.set("k", &"value", ttl).unwrap();

    thread::sleep(ttl / 2);
    assert_eq!(cache.get::<String>("k").unwrap().as_deref(), Some("value"));

    thread::sleep(ttl);
    assert_eq!(cache.get::<String>("k").unwrap(), None);
    // Expired entries are dropped on read.
    assert_eq!(cache.len(), 0);
}

#[test]
fn test_zero_ttl_expires_at_once() {
    let cache = MetadataCache::new();
    cache.set("k", &1u32, Duration::ZERO).unwrap();
    thread::sleep(Duration::from_millis(2));
    assert!(!cache.exists("k"));
    assert_eq!(cache.get::<u32>("k").unwrap(), None);
}

#[test]
fn test_sweep_removes_other_expired_entries() {
    let cache = MetadataCache::with_limits(10, Duration::ZERO);
    cache.set("short", &1u32, Duration::from_millis(20)).unwrap();
    cache.set("long", &2u32, Duration::from_secs(60)).unwrap();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(cache.get::<u32>("long").unwrap(), Some(2));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_stats_count_expired_entries() {
    let cache = MetadataCache::new();
    cache.set("a", &"x", Duration::from_millis(10)).unwrap();
    cache.set("b", &"y", Duration::from_secs(60)).unwrap();
    cache.get::<String>("b").unwrap();
    cache.get::<String>("b").unwrap();

    thread::sleep(Duration::from_millis(30));
    let stats = cache.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.expired_entries, 1);
    assert_eq!(stats.active_entries, 1);
    assert_eq!(stats.total_access_count, 2);
    assert_eq!(stats.max_size, 100);
    assert!((stats.utilization_percent - 2.0).abs() < 1e-9);
}

// ============================================================================
// Size bound
// ============================================================================

#[test]
fn test_bound_evicts_least_recently_accessed() {
    let cache = MetadataCache::with_limits(5, Duration::from_secs(300));
    let ttl = Duration::from_secs(60);

    for i in 0..5 {
        cache.set(&format!("k{i}"), &i, ttl).unwrap();
    }
    // Touch everything except k0.
    for i in 1..5 {
        assert_eq!(cache.get::<i32>(&format!("k{i}")).unwrap(), Some(i));
    }

    cache.set("k5", &5, ttl).unwrap();

    assert!(cache.len() <= 5);
    assert!(!cache.exists("k0"));
    for i in 1..=5 {
        assert!(cache.exists(&format!("k{i}")), "k{i} should survive");
    }
}

#[test]
fn test_bound_holds_under_many_inserts() {
    let cache = MetadataCache::with_limits(20, Duration::from_secs(300));
    for i in 0..200 {
        cache.set(&format!("key-{i}"), &i, Duration::from_secs(60)).unwrap();
        assert!(cache.len() <= 20);
    }
    // The newest entry always survives its own insert.
    assert!(cache.exists("key-199"));
}

#[test]
fn test_replacing_key_does_not_evict() {
    let cache = MetadataCache::with_limits(2, Duration::from_secs(300));
    let ttl = Duration::from_secs(60);
    cache.set("a", &1, ttl).unwrap();
    cache.set("b", &2, ttl).unwrap();
    cache.set("a", &3, ttl).unwrap();

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get::<i32>("a").unwrap(), Some(3));
    assert_eq!(cache.get::<i32>("b").unwrap(), Some(2));
}

// ============================================================================
// Concurrency and keys
// ============================================================================

#[test]
fn test_concurrent_writers_respect_bound() {
    let cache = Arc::new(MetadataCache::with_limits(16, Duration::from_secs(300)));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = CacheKey::table("db", "snapshot", &format!("t{t}_{i}"));
                    cache.set(&key, &i, Duration::from_secs(60)).unwrap();
                    let _ = cache.get::<i32>(&key).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.len() <= 16);
}

#[test]
fn test_keys_are_deterministic_hex() {
    let a = CacheKey::join_path("chinook", "s1", "Invoice", "Customer");
    let b = CacheKey::join_path("chinook", "s1", "Invoice", "Customer");
    let c = CacheKey::join_path("chinook", "s1", "Customer", "Invoice");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    assert_ne!(CacheKey::schema("chinook"), CacheKey::schema_hash("chinook"));
    assert_ne!(CacheKey::schema("chinook:hash"), CacheKey::schema_hash("chinook"));
}
