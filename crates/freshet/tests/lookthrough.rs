// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the look-through engine.

use std::{
    hash::Hash,
    sync::{Arc, Mutex},
    time::Duration,
};

use freshet::LookThrough;
use freshet_backend::{
    Cache as _, Error, Repository,
    testing::{CacheOp, MockCache, MockRepository},
};
use futures_util::{StreamExt, future::join_all, stream::FuturesUnordered};

/// Wraps a repository with a fixed response latency.
struct SlowRepo<R> {
    inner: R,
    delay: Duration,
}

impl<K, V, R> Repository<K, V> for SlowRepo<R>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
    R: Repository<K, V>,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }
}

fn set_count<K: PartialEq, V: PartialEq>(ops: &[CacheOp<K, V>]) -> usize {
    ops.iter().filter(|op| matches!(op, CacheOp::Set { .. })).count()
}

#[tokio::test]
async fn hit_is_served_from_cache_without_origin_traffic() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "key".to_string();

    cache.set(&key, "cached".to_string()).await.unwrap();
    cache.clear_operations();

    let engine = LookThrough::builder(cache.clone(), repo.clone()).build().unwrap();

    let value = engine.get(&key).await.unwrap();
    assert_eq!(value.as_deref(), Some("cached"));
    assert!(repo.calls().is_empty());
    assert_eq!(set_count(&cache.operations()), 0);
}

#[tokio::test]
async fn miss_loads_from_origin_and_caches() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "key".to_string();
    repo.put(key.clone(), "value".to_string());

    let engine = LookThrough::builder(cache.clone(), repo.clone()).build().unwrap();

    let value = engine.get(&key).await.unwrap();
    assert_eq!(value.as_deref(), Some("value"));
    assert_eq!(repo.call_count(&key), 1);
    assert_eq!(cache.stored(&key).as_deref(), Some("value"));
}

#[tokio::test]
async fn miss_then_hit() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "k".to_string();
    repo.put(key.clone(), "v".to_string());

    let slow = SlowRepo {
        inner: repo.clone(),
        delay: Duration::from_millis(100),
    };
    let engine = LookThrough::builder(cache.clone(), slow).build().unwrap();

    let begin = tokio::time::Instant::now();
    let value = engine.get(&key).await.unwrap();
    assert_eq!(value.as_deref(), Some("v"));
    assert!(begin.elapsed() >= Duration::from_millis(100));

    // The second read is served from the cache without another origin call.
    let value = engine.get(&key).await.unwrap();
    assert_eq!(value.as_deref(), Some("v"));
    assert_eq!(repo.call_count(&key), 1);
}

#[tokio::test]
async fn not_found_propagates_without_caching() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "missing".to_string();

    let engine = LookThrough::builder(cache.clone(), repo.clone()).build().unwrap();

    let value = engine.get(&key).await.unwrap();
    assert!(value.is_none());
    assert_eq!(repo.call_count(&key), 1);
    assert_eq!(set_count(&cache.operations()), 0);
}

#[tokio::test]
async fn origin_error_propagates_to_the_caller() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "key".to_string();
    repo.fail_when(|_| true);

    let engine = LookThrough::builder(cache.clone(), repo).build().unwrap();

    let error = engine.get(&key).await.unwrap_err();
    assert!(error.to_string().contains("repository get failed"));
    assert_eq!(set_count(&cache.operations()), 0);
}

#[tokio::test]
async fn cache_read_error_is_reported_and_treated_as_miss() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "key".to_string();
    repo.put(key.clone(), "value".to_string());
    cache.fail_when(|op| matches!(op, CacheOp::Get(_)));

    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);

    let engine = LookThrough::builder(cache.clone(), repo.clone())
        .error_callback(move |error| sink.lock().unwrap().push(error.to_string()))
        .build()
        .unwrap();

    // The origin is still consulted and the value returned.
    let value = engine.get(&key).await.unwrap();
    assert_eq!(value.as_deref(), Some("value"));
    assert_eq!(repo.call_count(&key), 1);

    let reported = reported.lock().unwrap();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].contains("cache get failed"));
}

#[tokio::test]
async fn cache_write_error_is_reported_and_swallowed() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "key".to_string();
    repo.put(key.clone(), "value".to_string());
    cache.fail_when(|op| matches!(op, CacheOp::Set { .. }));

    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);

    let engine = LookThrough::builder(cache.clone(), repo)
        .error_callback(move |error| sink.lock().unwrap().push(error.to_string()))
        .build()
        .unwrap();

    let value = engine.get(&key).await.unwrap();
    assert_eq!(value.as_deref(), Some("value"));

    let reported = reported.lock().unwrap();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].contains("cache set failed"));
}

#[tokio::test]
async fn missing_error_callback_swallows_silently() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "key".to_string();
    repo.put(key.clone(), "value".to_string());
    cache.fail_when(|_| true);

    let engine = LookThrough::builder(cache, repo).build().unwrap();

    let value = engine.get(&key).await.unwrap();
    assert_eq!(value.as_deref(), Some("value"));
}

#[tokio::test]
async fn concurrent_misses_coalesce_onto_one_origin_call() {
    let cache = MockCache::<String, String>::new();
    let repo = MockRepository::<String, String>::new();
    let key = "k".to_string();
    repo.put(key.clone(), "v".to_string());

    let slow = SlowRepo {
        inner: repo.clone(),
        delay: Duration::from_millis(100),
    };
    let engine = LookThrough::builder(cache.clone(), slow).build().unwrap();

    let reads = FuturesUnordered::new();
    for _ in 0..50 {
        reads.push(engine.get(&key));
    }
    let results: Vec<_> = reads.collect().await;

    assert_eq!(results.len(), 50);
    for result in results {
        assert_eq!(result.unwrap().as_deref(), Some("v"));
    }
    assert_eq!(repo.call_count(&key), 1);
    assert_eq!(set_count(&cache.operations()), 1);
}

#[tokio::test]
async fn backends_can_be_shared_through_arc() {
    let cache = Arc::new(MockCache::<String, String>::new());
    let repo = Arc::new(MockRepository::<String, String>::new());
    repo.put("key".to_string(), "value".to_string());

    let engine = LookThrough::builder(Arc::clone(&cache), Arc::clone(&repo)).build().unwrap();

    assert_eq!(engine.get(&"key".to_string()).await.unwrap().as_deref(), Some("value"));
    // The same handles observe the engine's traffic.
    assert_eq!(repo.call_count(&"key".to_string()), 1);
    assert_eq!(cache.stored(&"key".to_string()).as_deref(), Some("value"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn origin_called_once_per_key_regardless_of_reader_count() {
    for n in [2usize, 10, 50, 500] {
        let cache = MockCache::<String, String>::new();
        let repo = MockRepository::<String, String>::new();
        let key = format!("key-{n}");
        repo.put(key.clone(), "value".to_string());

        let slow = SlowRepo {
            inner: repo.clone(),
            delay: Duration::from_millis(50),
        };
        let engine = Arc::new(LookThrough::builder(cache, slow).build().unwrap());

        let tasks: Vec<_> = (0..n)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let key = key.clone();
                tokio::spawn(async move { engine.get(&key).await })
            })
            .collect();

        for outcome in join_all(tasks).await {
            let value = outcome.unwrap().unwrap();
            assert_eq!(value.as_deref(), Some("value"));
        }
        assert_eq!(repo.call_count(&key), 1, "with {n} concurrent readers");
    }
}
