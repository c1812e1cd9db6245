// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The stale-while-revalidate engine.

use std::{
    hash::Hash,
    sync::Arc,
    time::{Duration, Instant},
};

use coalesce::Coalescer;
use freshet_backend::{Cache, Entry, Error, Freshness, Repository};
use freshet_memory::MemoryCache;

use crate::{
    builder::{BuildError, ErrorCallback, SwrBuilder},
    refresh::{RefreshPipeline, Schedule},
    telemetry::{CacheActivity, CacheName, CacheTelemetry},
};

/// A stale-while-revalidate cache over a [`Repository`] origin.
///
/// Values are stored as [`Entry`]s carrying two deadlines. A `get` serves
/// fresh entries directly, serves stale entries immediately while scheduling
/// a background refresh, and reloads dead or missing entries synchronously.
/// Concurrent loads for the same key are coalesced so the origin sees at
/// most one request per key at a time.
///
/// Background refreshes run on a fixed pool of worker tasks behind a bounded
/// queue; when the queue is full, refresh requests are dropped rather than
/// blocking the caller, and the stale value keeps being served until a later
/// read schedules another attempt.
///
/// # Examples
///
/// ```no_run
/// use freshet::Swr;
/// use freshet_backend::testing::MockRepository;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = MockRepository::<String, String>::new();
/// repo.put("greeting".to_string(), "hello".to_string());
///
/// let swr = Swr::with_memory(1000, repo, Duration::from_secs(60), Duration::from_secs(300))?;
///
/// let value = swr.get(&"greeting".to_string()).await?;
/// assert_eq!(value.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
pub struct Swr<K, V, R, C> {
    inner: Arc<SwrInner<K, V, R, C>>,
    pipeline: RefreshPipeline<K>,
}

struct SwrInner<K, V, R, C> {
    repo: R,
    cache: C,
    time_to_stale: Duration,
    time_to_dead: Duration,
    refresh_timeout: Duration,
    dedup: Coalescer<K, Result<Option<V>, Error>>,
    error_callback: Option<ErrorCallback>,
    telemetry: Option<CacheTelemetry>,
    name: CacheName,
}

impl<K, V, R, C> std::fmt::Debug for Swr<K, V, R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swr")
            .field("name", &self.inner.name)
            .field("time_to_stale", &self.inner.time_to_stale)
            .field("time_to_dead", &self.inner.time_to_dead)
            .finish_non_exhaustive()
    }
}

impl Swr<(), (), (), ()> {
    /// Creates a new engine builder.
    ///
    /// Pick a storage backend on the builder with `memory()` or
    /// `storage()` before calling `build()`.
    #[must_use]
    pub fn builder<K, V, R>(repo: R, time_to_stale: Duration, time_to_dead: Duration) -> SwrBuilder<K, V, R> {
        SwrBuilder::new(repo, time_to_stale, time_to_dead)
    }
}

impl<K, V, R> Swr<K, V, R, MemoryCache<K, Entry<V>>>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    R: Repository<K, V> + 'static,
{
    /// Creates an engine backed by a bounded in-memory entry store.
    ///
    /// This is the default construction; use [`Swr::builder`] with
    /// `storage()` to provide an external entry store instead.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if a duration is zero.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, which is required to spawn
    /// the refresh workers.
    pub fn with_memory(capacity: u64, repo: R, time_to_stale: Duration, time_to_dead: Duration) -> Result<Self, BuildError> {
        Swr::builder(repo, time_to_stale, time_to_dead).memory(capacity).build()
    }
}

impl<K, V, R, C> Swr<K, V, R, C>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    R: Repository<K, V> + 'static,
    C: Cache<K, Entry<V>> + 'static,
{
    pub(crate) fn from_builder(builder: SwrBuilder<K, V, R, C>) -> Self {
        let inner = Arc::new(SwrInner {
            repo: builder.repo,
            cache: builder.storage,
            time_to_stale: builder.time_to_stale,
            time_to_dead: builder.time_to_dead,
            refresh_timeout: builder.refresh_timeout,
            dedup: Coalescer::new(),
            error_callback: builder.error_callback,
            telemetry: builder.telemetry,
            name: builder.name,
        });

        let worker_inner = Arc::clone(&inner);
        let pipeline = RefreshPipeline::start(builder.refresh_workers, builder.refresh_buffer_size, move |key: K| {
            let inner = Arc::clone(&worker_inner);
            async move { inner.refresh(&key).await }
        });

        Self { inner, pipeline }
    }

    /// Returns the name reported in telemetry.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.inner.name
    }

    /// Returns a reference to the entry store.
    #[must_use]
    pub fn cache(&self) -> &C {
        &self.inner.cache
    }

    /// Returns a reference to the origin repository.
    #[must_use]
    pub fn repo(&self) -> &R {
        &self.inner.repo
    }

    /// Gets the value for `key`.
    ///
    /// A fresh entry is returned without any origin traffic. A stale entry
    /// is returned immediately and a background refresh is scheduled; the
    /// refresh outcome is never visible to this or any other caller. A dead
    /// or missing entry is loaded from the origin synchronously, with
    /// concurrent loads for the same key coalesced onto one origin request.
    ///
    /// # Errors
    ///
    /// Returns an error only when a synchronous origin load fails. An entry
    /// store read failure is reported to the error callback and treated as
    /// a miss; store write failures never fail the get.
    pub async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let entry = match self.inner.cache.get(key).await {
            Ok(entry) => entry,
            Err(error) => {
                self.inner.report(&error);
                None
            }
        };

        let Some(entry) = entry else {
            self.inner.record(CacheActivity::Miss);
            return self.inner.load(key).await;
        };

        match entry.freshness(Instant::now()) {
            Freshness::Fresh => {
                self.inner.record(CacheActivity::Hit);
                Ok(Some(entry.into_value()))
            }
            Freshness::Stale => {
                self.inner.record(CacheActivity::Stale);
                if self.pipeline.schedule(key) == Schedule::Dropped {
                    self.inner.record(CacheActivity::RefreshDropped);
                }
                Ok(Some(entry.into_value()))
            }
            Freshness::Dead => {
                self.inner.record(CacheActivity::Dead);
                self.inner.load(key).await
            }
        }
    }

    /// Shuts the refresh pipeline down gracefully.
    ///
    /// Stops accepting new refresh requests, lets the workers drain what is
    /// already queued, and joins them. Reads keep working after close;
    /// stale entries are simply no longer revalidated. Dropping the engine
    /// without calling `close` also ends the workers once the queue drains,
    /// just without waiting for them.
    pub async fn close(&self) {
        self.pipeline.close().await;
    }
}

impl<K, V, R, C> SwrInner<K, V, R, C>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    R: Repository<K, V>,
    C: Cache<K, Entry<V>>,
{
    /// Loads `key` from the origin through the coalescer and offers the
    /// result to the entry store. Shared by synchronous miss/dead reads and
    /// the background refresh workers.
    async fn load(&self, key: &K) -> Result<Option<V>, Error> {
        self.dedup
            .run(key.clone(), || async {
                let value = match self.repo.get(key).await? {
                    Some(value) => value,
                    None => return Ok(None),
                };

                let entry = Entry::new(value.clone(), self.time_to_stale, self.time_to_dead);
                if let Err(error) = self.cache.set(key, entry).await {
                    self.report(&error);
                }

                Ok(Some(value))
            })
            .await
    }

    /// One background refresh: a fresh load bounded by the refresh timeout,
    /// detached from any caller. Failures are reported, never surfaced.
    async fn refresh(&self, key: &K) {
        match tokio::time::timeout(self.refresh_timeout, self.load(key)).await {
            Ok(Ok(_)) => self.record(CacheActivity::Refresh),
            Ok(Err(error)) => self.report(&error),
            Err(_) => self.report(&Error::from_message("background refresh timed out")),
        }
    }

    fn report(&self, error: &Error) {
        if let Some(callback) = &self.error_callback {
            callback(error);
        }
        self.record(CacheActivity::Error);
    }

    fn record(&self, activity: CacheActivity) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(self.name, activity);
        }
    }
}
