//! In-memory cache implementation using moka.
//!
//! This module provides an in-memory backend built on the moka crate, which
//! offers high-performance concurrent caching with eviction policies.

use std::hash::Hash;

use freshet_backend::{Cache, Error, Repository};
use moka::future::Cache as MokaCache;

use crate::builder::MemoryCacheBuilder;

/// An in-memory cache backend backed by moka.
///
/// This store provides:
/// - Concurrent access with high performance
/// - Automatic eviction based on capacity (`TinyLFU` policy)
/// - Thread-safe operations
///
/// Cloning is cheap and produces a handle to the same underlying store.
///
/// # Examples
///
/// ```
/// use freshet_backend::{Cache, Repository};
/// use freshet_memory::MemoryCache;
/// # futures::executor::block_on(async {
///
/// let cache = MemoryCache::<String, i32>::new();
///
/// cache.set(&"key".to_string(), 42).await?;
/// assert_eq!(cache.get(&"key".to_string()).await?, Some(42));
/// # Ok::<(), freshet_backend::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: MokaCache<K, V>,
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new unbounded in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new in-memory cache with a maximum capacity.
    ///
    /// Once the capacity is reached, entries are evicted using the
    /// `TinyLFU` policy (a combination of LRU eviction and LFU admission).
    ///
    /// # Examples
    ///
    /// ```
    /// use freshet_memory::MemoryCache;
    ///
    /// let cache = MemoryCache::<String, i32>::with_capacity(1000);
    /// ```
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a new builder for configuring an in-memory cache.
    #[must_use]
    pub fn builder() -> MemoryCacheBuilder<K, V> {
        MemoryCacheBuilder::new()
    }

    pub(crate) fn from_builder(builder: &MemoryCacheBuilder<K, V>) -> Self {
        let mut moka_builder = MokaCache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
        }
    }

    /// Returns the number of entries in the cache.
    ///
    /// The count is eventually consistent; call
    /// [`run_pending_tasks`](Self::run_pending_tasks) first for an exact
    /// figure.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Removes the entry for `key`, if present.
    pub async fn invalidate(&self, key: &K) {
        self.inner.invalidate(key).await;
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Processes pending internal maintenance such as deferred evictions.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl<K, V> Repository<K, V> for MemoryCache<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        Ok(self.inner.get(key).await)
    }
}

impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        self.inner.insert(key.clone(), value).await;
        Ok(())
    }
}
