// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory caches.
//!
//! This module provides a builder API for `MemoryCache` that abstracts the
//! underlying moka configuration, providing a stable API surface without
//! exposing moka's types.

use std::hash::Hash;
use std::marker::PhantomData;

use crate::tier::MemoryCache;

/// Builder for configuring a [`MemoryCache`].
///
/// # Examples
///
/// ```
/// use freshet_memory::MemoryCache;
///
/// let cache = MemoryCache::<String, i32>::builder()
///     .max_capacity(1000)
///     .initial_capacity(100)
///     .name("user-cache")
///     .build();
/// ```
#[derive(Debug)]
pub struct MemoryCacheBuilder<K, V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> Default for MemoryCacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryCacheBuilder<K, V> {
    /// Creates a new builder with default settings.
    ///
    /// The default configuration creates an unbounded cache with `TinyLFU`
    /// eviction policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Sets the maximum capacity of the cache.
    ///
    /// Once the capacity is reached, entries are evicted to make room for
    /// new entries. If not set, the cache is unbounded.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the initial capacity (pre-allocation hint) for the cache.
    ///
    /// This can improve performance by avoiding reallocations during initial
    /// population. The cache may still grow beyond this size.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a name for the cache.
    ///
    /// The name may appear in debugging output from the underlying cache
    /// implementation.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured [`MemoryCache`].
    #[must_use]
    pub fn build(self) -> MemoryCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        MemoryCache::from_builder(&self)
    }
}
