// Copyright (c) Microsoft Corporation.

//! Engine builders and construction-time validation.
//!
//! This module provides the builder pattern infrastructure for creating the
//! [`LookThrough`] and [`Swr`] engines with configurable storage, refresh
//! pipeline sizing, error callbacks, and telemetry.

use std::{hash::Hash, marker::PhantomData, sync::Arc, time::Duration};

use freshet_backend::{Cache, Entry, Error, Repository};
use freshet_memory::MemoryCache;

use crate::{
    lookthrough::LookThrough,
    swr::Swr,
    telemetry::{CacheName, CacheTelemetry},
};

/// Synchronous callback invoked at the site of a non-fatal operational
/// failure (cache read/write failures, background refresh failures).
///
/// The callback must be thread-safe; it may be invoked concurrently from
/// caller tasks and refresh workers.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Default number of background refresh workers.
pub const DEFAULT_REFRESH_WORKERS: usize = 3;
/// Default capacity of the refresh queue.
pub const DEFAULT_REFRESH_BUFFER_SIZE: usize = 256;
/// Default timeout applied to each background refresh.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// An invalid engine configuration, reported at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    /// `time_to_stale` was zero.
    #[error("time to stale must be positive")]
    ZeroTimeToStale,
    /// `time_to_dead` was zero.
    #[error("time to dead must be positive")]
    ZeroTimeToDead,
    /// `refresh_workers` was zero.
    #[error("refresh workers count must be positive")]
    ZeroRefreshWorkers,
    /// `refresh_buffer_size` was zero.
    #[error("refresh buffer size must be positive")]
    ZeroRefreshBufferSize,
    /// `refresh_timeout` was zero.
    #[error("refresh timeout must be positive")]
    ZeroRefreshTimeout,
}

/// Builder for a [`LookThrough`] engine.
///
/// Created by [`LookThrough::builder`].
///
/// # Examples
///
/// ```no_run
/// use freshet::LookThrough;
/// use freshet_backend::testing::{MockCache, MockRepository};
///
/// # fn main() -> Result<(), freshet::BuildError> {
/// let cache = MockCache::<String, String>::new();
/// let repo = MockRepository::<String, String>::new();
///
/// let engine = LookThrough::builder(cache, repo)
///     .name("users")
///     .error_callback(|error| eprintln!("cache trouble: {error}"))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct LookThroughBuilder<K, V, C, R> {
    pub(crate) cache: C,
    pub(crate) repo: R,
    pub(crate) error_callback: Option<ErrorCallback>,
    pub(crate) telemetry: Option<CacheTelemetry>,
    pub(crate) name: CacheName,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V, C, R> LookThroughBuilder<K, V, C, R>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Cache<K, V>,
    R: Repository<K, V>,
{
    pub(crate) fn new(cache: C, repo: R) -> Self {
        Self {
            cache,
            repo,
            error_callback: None,
            telemetry: None,
            name: "lookthrough",
            _phantom: PhantomData,
        }
    }

    /// Sets the callback invoked synchronously on non-fatal failures.
    #[must_use]
    pub fn error_callback(mut self, callback: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.error_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the name reported in telemetry.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Enables telemetry recording for this engine.
    #[must_use]
    pub fn telemetry(mut self, telemetry: CacheTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the configuration violates a constraint.
    pub fn build(self) -> Result<LookThrough<K, V, C, R>, BuildError> {
        Ok(LookThrough::from_builder(self))
    }
}

/// Builder for an [`Swr`] engine.
///
/// Created by [`Swr::builder`]. The storage slot starts empty; pick one with
/// [`memory`](Self::memory) or [`storage`](Self::storage) before calling
/// `build`.
///
/// # Examples
///
/// ```no_run
/// use freshet::Swr;
/// use freshet_backend::testing::MockRepository;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), freshet::BuildError> {
/// let repo = MockRepository::<String, String>::new();
///
/// let engine = Swr::builder(repo, Duration::from_secs(60), Duration::from_secs(300))
///     .memory(10_000)
///     .refresh_workers(4)
///     .refresh_buffer_size(512)
///     .refresh_timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SwrBuilder<K, V, R, C = ()> {
    pub(crate) repo: R,
    pub(crate) storage: C,
    pub(crate) time_to_stale: Duration,
    pub(crate) time_to_dead: Duration,
    pub(crate) refresh_workers: usize,
    pub(crate) refresh_buffer_size: usize,
    pub(crate) refresh_timeout: Duration,
    pub(crate) error_callback: Option<ErrorCallback>,
    pub(crate) telemetry: Option<CacheTelemetry>,
    pub(crate) name: CacheName,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V, R> SwrBuilder<K, V, R, ()> {
    pub(crate) fn new(repo: R, time_to_stale: Duration, time_to_dead: Duration) -> Self {
        Self {
            repo,
            storage: (),
            time_to_stale,
            time_to_dead,
            refresh_workers: DEFAULT_REFRESH_WORKERS,
            refresh_buffer_size: DEFAULT_REFRESH_BUFFER_SIZE,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            error_callback: None,
            telemetry: None,
            name: "swr",
            _phantom: PhantomData,
        }
    }

    /// Configures the engine to store entries in a bounded in-memory cache.
    ///
    /// Entries are evicted by the store's `TinyLFU` policy once `capacity`
    /// is reached.
    #[must_use]
    pub fn memory(self, capacity: u64) -> SwrBuilder<K, V, R, MemoryCache<K, Entry<V>>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.storage(MemoryCache::with_capacity(capacity))
    }

    /// Sets a custom storage backend for entries.
    ///
    /// Use this to provide your own [`Cache`] implementation instead of the
    /// built-in [`memory`](Self::memory) option.
    #[must_use]
    pub fn storage<C>(self, storage: C) -> SwrBuilder<K, V, R, C>
    where
        C: Cache<K, Entry<V>>,
    {
        SwrBuilder {
            repo: self.repo,
            storage,
            time_to_stale: self.time_to_stale,
            time_to_dead: self.time_to_dead,
            refresh_workers: self.refresh_workers,
            refresh_buffer_size: self.refresh_buffer_size,
            refresh_timeout: self.refresh_timeout,
            error_callback: self.error_callback,
            telemetry: self.telemetry,
            name: self.name,
            _phantom: PhantomData,
        }
    }
}

impl<K, V, R, C> SwrBuilder<K, V, R, C> {
    /// Sets how many worker tasks process background refreshes.
    #[must_use]
    pub fn refresh_workers(mut self, workers: usize) -> Self {
        self.refresh_workers = workers;
        self
    }

    /// Sets how many pending refresh requests may queue up.
    ///
    /// When the queue is full, further refresh requests are dropped rather
    /// than blocking the caller.
    #[must_use]
    pub fn refresh_buffer_size(mut self, size: usize) -> Self {
        self.refresh_buffer_size = size;
        self
    }

    /// Sets the timeout applied to each background refresh.
    #[must_use]
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Sets the callback invoked synchronously on non-fatal failures.
    #[must_use]
    pub fn error_callback(mut self, callback: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.error_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the name reported in telemetry.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Enables telemetry recording for this engine.
    #[must_use]
    pub fn telemetry(mut self, telemetry: CacheTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.time_to_stale.is_zero() {
            return Err(BuildError::ZeroTimeToStale);
        }
        if self.time_to_dead.is_zero() {
            return Err(BuildError::ZeroTimeToDead);
        }
        if self.refresh_workers == 0 {
            return Err(BuildError::ZeroRefreshWorkers);
        }
        if self.refresh_buffer_size == 0 {
            return Err(BuildError::ZeroRefreshBufferSize);
        }
        if self.refresh_timeout.is_zero() {
            return Err(BuildError::ZeroRefreshTimeout);
        }
        Ok(())
    }
}

impl<K, V, R, C> SwrBuilder<K, V, R, C>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    R: Repository<K, V> + 'static,
    C: Cache<K, Entry<V>> + 'static,
{
    /// Builds the engine and starts its refresh workers.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the configuration violates a constraint.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, which is required to spawn
    /// the refresh workers.
    pub fn build(self) -> Result<Swr<K, V, R, C>, BuildError> {
        self.validate()?;
        Ok(Swr::from_builder(self))
    }
}
