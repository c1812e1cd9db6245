// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The look-through (read-through) engine.

use std::hash::Hash;

use coalesce::Coalescer;
use freshet_backend::{Cache, Error, Repository};

use crate::{
    builder::{ErrorCallback, LookThroughBuilder},
    telemetry::{CacheActivity, CacheName, CacheTelemetry},
};

/// A read-through cache composing a [`Cache`] and a [`Repository`] origin.
///
/// A `get` probes the cache first and resolves misses through the origin,
/// with concurrent loads for the same key coalesced onto a single origin
/// request. Successful loads are offered to the cache best-effort: a failed
/// write is reported to the error callback but never fails the read.
///
/// # Examples
///
/// ```
/// use freshet::LookThrough;
/// use freshet_backend::testing::{MockCache, MockRepository};
///
/// # futures::executor::block_on(async {
/// let cache = MockCache::<String, String>::new();
/// let repo = MockRepository::<String, String>::new();
/// repo.put("k".to_string(), "v".to_string());
///
/// let engine = LookThrough::builder(cache, repo).build()?;
///
/// // First read resolves through the origin and caches the value.
/// assert_eq!(engine.get(&"k".to_string()).await?.as_deref(), Some("v"));
/// // Second read is served from the cache.
/// assert_eq!(engine.get(&"k".to_string()).await?.as_deref(), Some("v"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
pub struct LookThrough<K, V, C, R> {
    cache: C,
    repo: R,
    dedup: Coalescer<K, Result<Option<V>, Error>>,
    error_callback: Option<ErrorCallback>,
    telemetry: Option<CacheTelemetry>,
    name: CacheName,
}

impl<K, V, C, R> std::fmt::Debug for LookThrough<K, V, C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookThrough").field("name", &self.name).finish_non_exhaustive()
    }
}

impl LookThrough<(), (), (), ()> {
    /// Creates a new engine builder over the given cache and origin.
    #[must_use]
    pub fn builder<K, V, C, R>(cache: C, repo: R) -> LookThroughBuilder<K, V, C, R>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        C: Cache<K, V>,
        R: Repository<K, V>,
    {
        LookThroughBuilder::new(cache, repo)
    }
}

impl<K, V, C, R> LookThrough<K, V, C, R>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Cache<K, V>,
    R: Repository<K, V>,
{
    pub(crate) fn from_builder(builder: LookThroughBuilder<K, V, C, R>) -> Self {
        Self {
            cache: builder.cache,
            repo: builder.repo,
            dedup: Coalescer::new(),
            error_callback: builder.error_callback,
            telemetry: builder.telemetry,
            name: builder.name,
        }
    }

    /// Returns the name reported in telemetry.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    /// Returns a reference to the cache backend.
    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns a reference to the origin repository.
    #[must_use]
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Gets the value for `key`, resolving cache misses through the origin.
    ///
    /// A cache read failure is reported to the error callback and treated
    /// as a miss; the origin is still consulted. Origin not-found
    /// propagates as `Ok(None)` and is not cached.
    ///
    /// # Errors
    ///
    /// Returns an error when the origin load fails. Cache write failures
    /// are reported to the error callback and never fail the get.
    pub async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        match self.cache.get(key).await {
            Ok(Some(value)) => {
                self.record(CacheActivity::Hit);
                return Ok(Some(value));
            }
            Ok(None) => self.record(CacheActivity::Miss),
            Err(error) => self.report(&error),
        }

        self.load(key).await
    }

    /// Loads `key` from the origin through the coalescer and offers the
    /// result to the cache.
    async fn load(&self, key: &K) -> Result<Option<V>, Error> {
        self.dedup
            .run(key.clone(), || async {
                let value = match self.repo.get(key).await? {
                    Some(value) => value,
                    None => return Ok(None),
                };

                if let Err(error) = self.cache.set(key, value.clone()).await {
                    self.report(&error);
                }

                Ok(Some(value))
            })
            .await
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
