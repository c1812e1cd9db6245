// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The capability traits consumed by the cache engines.
//!
//! [`Repository`] is a read-only origin; [`Cache`] extends it with a
//! best-effort write. Engines treat both as opaque capability providers and
//! never introspect the implementation behind them.

use std::sync::Arc;

use crate::Error;

/// A read-only source of values.
///
/// `Ok(Some(value))` means the key was found, `Ok(None)` means the origin
/// has no value for it, and `Err` signals a transport failure. Engines treat
/// the last two very differently: a not-found is a cacheable-as-nothing miss
/// while a transport error is never mistaken for one.
///
/// Implementations must be safe to call concurrently from multiple tasks.
pub trait Repository<K, V>: Send + Sync {
    /// Gets the value for `key`, if the origin has one.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send
    where
        K: Sync;
}

/// A read/write store.
///
/// `set` is advisory: engines report a failed write and move on, so an
/// implementation may shed writes under pressure without breaking reads.
pub trait Cache<K, V>: Repository<K, V> {
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send
    where
        K: Sync,
        V: Send;
}

impl<K, V, R> Repository<K, V> for Arc<R>
where
    R: Repository<K, V>,
{
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send
    where
        K: Sync,
    {
        (**self).get(key)
    }
}

impl<K, V, C> Cache<K, V> for Arc<C>
where
    C: Cache<K, V>,
{
    fn set(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send
    where
        K: Sync,
        V: Send,
    {
        (**self).set(key, value)
    }
}
