// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock backends for testing.
//!
//! This module provides [`MockRepository`] and [`MockCache`], configurable
//! in-memory backends that record all operations and support failure
//! injection for testing error paths.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{Cache, Error, Repository};

type FailPredicate<O> = Box<dyn Fn(&O) -> bool + Send + Sync>;

/// Recorded cache operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp<K, V> {
    /// A get operation was performed with the given key.
    Get(K),
    /// A set operation was performed with the given key and value.
    Set {
        /// The key that was written.
        key: K,
        /// The value that was written.
        value: V,
    },
}

/// A configurable mock repository for testing.
///
/// Stores values in memory, records every key requested, and can be
/// configured to fail lookups on demand. Cloning produces a handle to the
/// same shared state, so a test can keep one handle for assertions while the
/// engine owns another.
///
/// # Examples
///
/// ```no_run
/// use freshet_backend::{testing::MockRepository, Repository};
///
/// # async fn example() {
/// let repo = MockRepository::<String, i32>::new();
/// repo.put("key".to_string(), 42);
///
/// assert_eq!(repo.get(&"key".to_string()).await.unwrap(), Some(42));
/// assert_eq!(repo.get(&"missing".to_string()).await.unwrap(), None);
/// assert_eq!(repo.calls(), vec!["key".to_string(), "missing".to_string()]);
/// # }
/// ```
pub struct MockRepository<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    calls: Arc<Mutex<Vec<K>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K>>>>,
}

impl<K, V> std::fmt::Debug for MockRepository<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRepository")
            .field("data", &self.data)
            .field("calls", &self.calls)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for MockRepository<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            calls: Arc::clone(&self.calls),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for MockRepository<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockRepository<K, V> {
    /// Creates a new empty mock repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K, V> MockRepository<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates a mock repository with pre-populated data.
    #[must_use]
    pub fn with_data(data: HashMap<K, V>) -> Self {
        let repo = Self::new();
        *repo.data.lock() = data;
        repo
    }

    /// Seeds or replaces the value returned for `key`.
    pub fn put(&self, key: K, value: V) {
        self.data.lock().insert(key, value);
    }

    /// Removes the value for `key`, turning later lookups into not-found.
    pub fn remove(&self, key: &K) {
        self.data.lock().remove(key);
    }

    /// Sets a predicate that determines which lookups fail with a transport
    /// error.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&K) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all lookups to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns every key requested so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<K> {
        self.calls.lock().clone()
    }

    /// Returns how many times `key` has been requested.
    #[must_use]
    pub fn call_count(&self, key: &K) -> usize {
        self.calls.lock().iter().filter(|k| *k == key).count()
    }

    /// Clears all recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

impl<K, V> Repository<K, V> for MockRepository<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        self.calls.lock().push(key.clone());
        if self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(key)) {
            return Err(Error::from_message("mock: repository get failed"));
        }
        Ok(self.data.lock().get(key).cloned())
    }
}

/// A configurable mock cache for testing.
///
/// Stores values in memory and can be configured to fail operations on
/// demand, making it useful for testing error handling paths. All
/// operations are recorded for later verification. Cloning produces a
/// handle to the same shared state.
///
/// # Examples
///
/// ```no_run
/// use freshet_backend::{testing::{CacheOp, MockCache}, Cache, Repository};
///
/// # async fn example() {
/// let cache = MockCache::<String, i32>::new();
///
/// cache.set(&"key".to_string(), 42).await.unwrap();
/// let value = cache.get(&"key".to_string()).await.unwrap();
/// assert_eq!(value, Some(42));
///
/// assert_eq!(cache.operations(), vec![
///     CacheOp::Set { key: "key".to_string(), value: 42 },
///     CacheOp::Get("key".to_string()),
/// ]);
/// # }
/// ```
///
/// # Failure injection
///
/// ```no_run
/// use freshet_backend::{testing::{CacheOp, MockCache}, Repository};
///
/// # async fn example() {
/// let cache: MockCache<String, i32> = MockCache::new();
///
/// // Fail only specific keys
/// cache.fail_when(|op| matches!(op, CacheOp::Get(k) if k == "forbidden"));
/// assert!(cache.get(&"forbidden".to_string()).await.is_err());
/// assert!(cache.get(&"allowed".to_string()).await.is_ok());
/// # }
/// ```
pub struct MockCache<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    operations: Arc<Mutex<Vec<CacheOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<CacheOp<K, V>>>>>,
}

impl<K, V> std::fmt::Debug for MockCache<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCache")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for MockCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for MockCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockCache<K, V> {
    /// Creates a new empty mock cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K, V> MockCache<K, V>
where
    K: Eq + Hash,
{
    /// Creates a mock cache with pre-populated data.
    #[must_use]
    pub fn with_data(data: HashMap<K, V>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the number of entries in the cache.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the cache contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<K, V> MockCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Returns the current value stored under `key`, if any.
    #[must_use]
    pub fn stored(&self, key: &K) -> Option<V> {
        self.data.lock().get(key).cloned()
    }

    /// Sets a predicate that determines which operations fail.
    ///
    /// The predicate receives the operation and returns `true` if it should
    /// fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<CacheOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: CacheOp<K, V>) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &CacheOp<K, V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<K, V> Repository<K, V> for MockCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let op = CacheOp::Get(key.clone());
        let fail = self.should_fail(&op);
        self.record(op);
        if fail {
            return Err(Error::from_message("mock: cache get failed"));
        }
        Ok(self.data.lock().get(key).cloned())
    }
}

impl<K, V> Cache<K, V> for MockCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn set(&self, key: &K, value: V) -> Result<(), Error> {
        let op = CacheOp::Set {
            key: key.clone(),
            value: value.clone(),
        };
        let fail = self.should_fail(&op);
        self.record(op);
        if fail {
            return Err(Error::from_message("mock: cache set failed"));
        }
        self.data.lock().insert(key.clone(), value);
        Ok(())
    }
}
