// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `MemoryCache`.

use freshet_backend::{Cache, Entry, Repository};
use freshet_memory::{MemoryCache, MemoryCacheBuilder};
use std::time::Duration;

fn block_on<F: Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[test]
fn new_creates_unbounded_cache() {
    let cache = MemoryCache::<String, i32>::new();
    assert_eq!(cache.entry_count(), 0);
}

#[test]
fn with_capacity_creates_bounded_cache() {
    let cache = MemoryCache::<String, i32>::with_capacity(100);
    assert_eq!(cache.entry_count(), 0);
}

#[test]
fn default_creates_unbounded_cache() {
    let cache = MemoryCache::<String, i32>::default();
    assert_eq!(cache.entry_count(), 0);
}

#[test]
fn get_returns_none_for_missing_key() {
    block_on(async {
        let cache = MemoryCache::<String, i32>::new();
        let result = cache.get(&"missing".to_string()).await.expect("get failed");
        assert!(result.is_none());
    });
}

#[test]
fn set_and_get_returns_value() {
    block_on(async {
        let cache = MemoryCache::<String, i32>::new();
        cache.set(&"key".to_string(), 42).await.expect("set failed");

        let value = cache.get(&"key".to_string()).await.expect("get failed");
        assert_eq!(value, Some(42));
    });
}

#[test]
fn set_overwrites_existing_value() {
    block_on(async {
        let cache = MemoryCache::<String, i32>::new();
        cache.set(&"key".to_string(), 42).await.expect("set failed");
        cache.set(&"key".to_string(), 100).await.expect("set failed");

        let value = cache.get(&"key".to_string()).await.expect("get failed");
        assert_eq!(value, Some(100));
    });
}

#[test]
fn invalidate_removes_value() {
    block_on(async {
        let cache = MemoryCache::<String, i32>::new();
        cache.set(&"key".to_string(), 42).await.expect("set failed");
        cache.invalidate(&"key".to_string()).await;

        let value = cache.get(&"key".to_string()).await.expect("get failed");
        assert!(value.is_none());
    });
}

#[test]
fn clear_removes_all_values() {
    block_on(async {
        let cache = MemoryCache::<String, i32>::new();
        cache.set(&"a".to_string(), 1).await.expect("set failed");
        cache.set(&"b".to_string(), 2).await.expect("set failed");
        cache.clear();
        cache.run_pending_tasks().await;

        assert!(cache.get(&"a".to_string()).await.expect("get failed").is_none());
        assert!(cache.get(&"b".to_string()).await.expect("get failed").is_none());
    });
}

#[test]
fn entry_count_tracks_inserts() {
    block_on(async {
        let cache = MemoryCache::<String, i32>::new();
        cache.set(&"a".to_string(), 1).await.expect("set failed");
        cache.set(&"b".to_string(), 2).await.expect("set failed");
        cache.run_pending_tasks().await;

        assert_eq!(cache.entry_count(), 2);
    });
}

#[test]
fn clone_shares_underlying_store() {
    block_on(async {
        let cache = MemoryCache::<String, i32>::new();
        let handle = cache.clone();

        cache.set(&"key".to_string(), 7).await.expect("set failed");
        let value = handle.get(&"key".to_string()).await.expect("get failed");
        assert_eq!(value, Some(7));
    });
}

#[test]
fn builder_configures_capacity_and_name() {
    block_on(async {
        let cache = MemoryCacheBuilder::<String, i32>::new()
            .max_capacity(10)
            .initial_capacity(4)
            .name("test-cache")
            .build();

        cache.set(&"key".to_string(), 1).await.expect("set failed");
        assert_eq!(cache.get(&"key".to_string()).await.expect("get failed"), Some(1));
    });
}

#[test]
fn bounded_cache_evicts_beyond_capacity() {
    block_on(async {
        let cache = MemoryCache::<String, i32>::with_capacity(8);
        for i in 0..64 {
            cache.set(&format!("key{i}"), i).await.expect("set failed");
        }
        cache.run_pending_tasks().await;

        assert!(cache.entry_count() <= 8);
    });
}

#[test]
fn stores_entries_for_the_swr_engine() {
    block_on(async {
        let cache = MemoryCache::<String, Entry<String>>::new();
        let entry = Entry::new("value".to_string(), Duration::from_secs(60), Duration::from_secs(300));

        cache.set(&"key".to_string(), entry.clone()).await.expect("set failed");
        let stored = cache
            .get(&"key".to_string())
            .await
            .expect("get failed")
            .expect("entry should exist");
        assert_eq!(stored, entry);
    });
}
